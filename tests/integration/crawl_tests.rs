//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock catalog servers and test
//! the full crawl, assembly and query cycle end-to-end.

use book_harvest::catalog::Catalog;
use book_harvest::config::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use book_harvest::crawler::{run_crawl, Coordinator, FetchCause, HttpFetcher, PageSource};
use book_harvest::model::{Category, CrawlErrorKind, CrawlStage};
use book_harvest::output::Dataset;
use book_harvest::HarvestError;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "HarvestTest/1.0";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dataset_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_fetches: 2,
            request_timeout_ms: 500,
            max_pages: 10,
        },
        site: SiteConfig {
            base_url: base_url.to_string(),
            user_agent: USER_AGENT.to_string(),
        },
        output: OutputConfig {
            dataset_path: dataset_path.to_string(),
        },
    }
}

/// One `article.product_pod` as the catalog renders it
fn product(href: &str, title: &str, price: &str, rating: &str, image: &str) -> String {
    format!(
        r#"<li class="col-xs-6 col-sm-4 col-md-3 col-lg-3">
            <article class="product_pod">
                <div class="image_container">
                    <a href="{href}"><img src="{image}" alt="{title}" class="thumbnail"></a>
                </div>
                <p class="star-rating {rating}">
                    <i class="icon-star"></i>
                </p>
                <h3><a href="{href}" title="{title}">{title}</a></h3>
                <div class="product_price">
                    <p class="price_color">{price}</p>
                    <p class="instock availability">
                        <i class="icon-ok"></i>
                        In stock
                    </p>
                </div>
            </article>
        </li>"#
    )
}

fn listing_page(products: &[String], pager: Option<(u32, u32)>) -> String {
    let pager = pager
        .map(|(current, total)| {
            format!(
                r#"<ul class="pager"><li class="current">Page {} of {}</li></ul>"#,
                current, total
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><head><title>All products</title></head><body>
            <section><ol class="row">{}</ol>{}</section>
        </body></html>"#,
        products.concat(),
        pager
    )
}

fn detail_page(category: &str, title: &str) -> String {
    format!(
        r#"<html><body>
            <ul class="breadcrumb">
                <li><a href="../../index.html">Home</a></li>
                <li><a href="../category/books_1/index.html">Books</a></li>
                <li><a href="../category/books/x/index.html">{}</a></li>
                <li class="active">{}</li>
            </ul>
        </body></html>"#,
        category, title
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String, delay: Option<Duration>) {
    let mut response = ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8");
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts a two-page catalog
///
/// Page 1 lists books 1, 2, 3; page 2 lists book 4 and book 2 again.
/// Book 3's detail page is slower than the configured timeout and book 1's
/// detail page is slow enough to complete after the others.
async fn mount_two_page_catalog(server: &MockServer) {
    let page_one = listing_page(
        &[
            product(
                "catalogue/a-light-in-the-attic_1/index.html",
                "A Light in the Attic",
                "£51.77",
                "Three",
                "media/cache/2c/da/1.jpg",
            ),
            product(
                "catalogue/tipping-the-velvet_2/index.html",
                "Tipping the Velvet",
                "£53.74",
                "One",
                "media/cache/26/0c/2.jpg",
            ),
            product(
                "catalogue/soumission_3/index.html",
                "Soumission",
                "£50.10",
                "One",
                "media/cache/3e/ef/3.jpg",
            ),
        ],
        Some((1, 2)),
    );

    let page_two = listing_page(
        &[
            product(
                "sharp-objects_4/index.html",
                "Sharp Objects",
                "£47.82",
                "Four",
                "../media/cache/32/51/4.jpg",
            ),
            product(
                "tipping-the-velvet_2/index.html",
                "Tipping the Velvet",
                "£53.74",
                "One",
                "../media/cache/26/0c/2.jpg",
            ),
        ],
        Some((2, 2)),
    );

    // The root only answers requests carrying the configured User-Agent
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_one)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;

    mount_html(server, "/catalogue/page-2.html", page_two, None).await;

    mount_html(
        server,
        "/catalogue/a-light-in-the-attic_1/index.html",
        detail_page("Poetry", "A Light in the Attic"),
        Some(Duration::from_millis(250)),
    )
    .await;
    mount_html(
        server,
        "/catalogue/tipping-the-velvet_2/index.html",
        detail_page("Historical Fiction", "Tipping the Velvet"),
        None,
    )
    .await;
    mount_html(
        server,
        "/catalogue/soumission_3/index.html",
        detail_page("Fiction", "Soumission"),
        Some(Duration::from_secs(3)),
    )
    .await;
    mount_html(
        server,
        "/catalogue/sharp-objects_4/index.html",
        detail_page("Mystery", "Sharp Objects"),
        None,
    )
    .await;
}

#[tokio::test]
async fn test_full_crawl_two_pages_with_timeout() {
    let mock_server = MockServer::start().await;
    mount_two_page_catalog(&mock_server).await;

    let base_url = format!("{}/", mock_server.uri());
    let config = create_test_config(&base_url, "unused.csv");

    let result = run_crawl(&config).await.expect("Crawl failed");

    // Discovery order: page 1 items, then page 2 items
    let ids: Vec<&str> = result.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "2"]);
    assert_eq!(result.total_pages(), 2);

    // The timed-out item is kept with the sentinel category
    let soumission = &result.records()[2];
    assert_eq!(soumission.category, Category::Unavailable);
    assert_eq!(soumission.price, 50.10);

    assert_eq!(
        result.records()[0].category,
        Category::Named("Poetry".to_string())
    );
    assert_eq!(
        result.records()[0].image_url.as_str(),
        format!("{}media/cache/2c/da/1.jpg", base_url)
    );
    assert_eq!(
        result.records()[3].image_url.as_str(),
        format!("{}media/cache/32/51/4.jpg", base_url)
    );

    // Exactly one error, tagged with the timed-out book
    assert_eq!(result.errors().len(), 1);
    let error = &result.errors()[0];
    assert_eq!(error.book_id.as_deref(), Some("3"));
    assert_eq!(error.stage, CrawlStage::Detail);
    assert_eq!(error.kind, CrawlErrorKind::Fetch);

    // Dedup collapses the re-listed book
    let dataset = Dataset::assemble(&result);
    let rows: Vec<&str> = dataset.rows().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(rows, vec!["1", "2", "3", "4"]);
    assert_eq!(dataset.duplicates_dropped(), 1);
}

#[tokio::test]
async fn test_dataset_round_trip_through_catalog() {
    let mock_server = MockServer::start().await;
    mount_two_page_catalog(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dataset_path = dir.path().join("data").join("livros.csv");

    let base_url = format!("{}/", mock_server.uri());
    let config = create_test_config(&base_url, &dataset_path.to_string_lossy());

    let result = run_crawl(&config).await.expect("Crawl failed");
    let dataset = Dataset::assemble(&result);
    dataset.write_to(&dataset_path).expect("Failed to write dataset");

    // Assembly and serialization are deterministic
    let again = Dataset::assemble(&result).to_csv_bytes().unwrap();
    assert_eq!(std::fs::read(&dataset_path).unwrap(), again);

    let catalog = Catalog::load(&dataset_path).expect("Failed to load catalog");
    assert_eq!(catalog.len(), 4);
    assert_eq!(
        catalog.categories(),
        vec!["Erro ao obter", "Historical Fiction", "Mystery", "Poetry"]
    );

    let book = catalog.get("1").unwrap();
    assert_eq!(book.title, "A Light in the Attic");
    assert_eq!(book.price, 51.77);
    assert_eq!(book.rating, "Three");
    assert_eq!(book.availability, "In stock");

    assert_eq!(catalog.search(Some("velvet"), None).len(), 1);
    assert!(catalog.get("99").unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_single_page_catalog_without_pager() {
    let mock_server = MockServer::start().await;

    let page = listing_page(
        &[product(
            "catalogue/only-book_7/index.html",
            "Only Book",
            "£12.00",
            "Five",
            "media/7.jpg",
        )],
        None,
    );
    mount_html(&mock_server, "/", page, None).await;

    // A breadcrumb without the category entry
    mount_html(
        &mock_server,
        "/catalogue/only-book_7/index.html",
        r#"<ul class="breadcrumb"><li><a href="/">Home</a></li><li><a href="/books">Books</a></li></ul>"#
            .to_string(),
        None,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.csv");
    let result = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(result.total_pages(), 1);
    assert_eq!(result.records().len(), 1);
    assert_eq!(result.records()[0].category, Category::Uncategorized);
    assert!(result.errors().is_empty());
}

#[tokio::test]
async fn test_missing_breadcrumb_is_reported_separately_from_uncategorized() {
    let mock_server = MockServer::start().await;

    let page = listing_page(
        &[product(
            "catalogue/bare_8/index.html",
            "Bare",
            "£1.00",
            "Two",
            "media/8.jpg",
        )],
        None,
    );
    mount_html(&mock_server, "/", page, None).await;
    mount_html(
        &mock_server,
        "/catalogue/bare_8/index.html",
        "<html><body><p>No navigation here</p></body></html>".to_string(),
        None,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.csv");
    let result = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(result.records()[0].category, Category::Unavailable);
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].kind, CrawlErrorKind::Parse);
    assert_eq!(result.errors()[0].book_id.as_deref(), Some("8"));
}

#[tokio::test]
async fn test_failed_listing_page_recorded() {
    let mock_server = MockServer::start().await;

    let page_one = listing_page(
        &[product(
            "catalogue/first_1/index.html",
            "First",
            "£2.00",
            "Two",
            "media/1.jpg",
        )],
        Some((1, 3)),
    );
    let page_three = listing_page(
        &[product(
            "third_3/index.html",
            "Third",
            "£4.00",
            "Four",
            "../media/3.jpg",
        )],
        Some((3, 3)),
    );
    mount_html(&mock_server, "/", page_one, None).await;
    mount_html(&mock_server, "/catalogue/page-3.html", page_three, None).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_html(
        &mock_server,
        "/catalogue/first_1/index.html",
        detail_page("Travel", "First"),
        None,
    )
    .await;
    mount_html(
        &mock_server,
        "/catalogue/third_3/index.html",
        detail_page("Travel", "Third"),
        None,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.csv");
    let result = run_crawl(&config).await.expect("Crawl failed");

    let ids: Vec<&str> = result.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(result.failed_pages(), vec![2]);
    assert_eq!(result.errors()[0].stage, CrawlStage::Listing);
}

#[tokio::test]
async fn test_unreachable_root_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), "unused.csv");
    let error = run_crawl(&config).await.unwrap_err();

    match error {
        HarvestError::CatalogUnreachable(fetch_error) => {
            assert_eq!(fetch_error.cause, FetchCause::Status(503));
        }
        other => panic!("Expected CatalogUnreachable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetcher_timeout_is_typed() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/slow",
        "<html></html>".to_string(),
        Some(Duration::from_secs(2)),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.csv");
    let fetcher =
        HttpFetcher::from_config(&config.site, &config.crawler).expect("Failed to build client");

    let url = url::Url::parse(&format!("{}/slow", mock_server.uri())).unwrap();
    let error = fetcher.fetch(&url).await.unwrap_err();
    assert!(error.is_timeout());
    assert_eq!(error.url, url.as_str());
}

#[tokio::test]
async fn test_coordinator_pool_bound_over_http() {
    let mock_server = MockServer::start().await;

    let products: Vec<String> = (1..=8)
        .map(|i| {
            product(
                &format!("catalogue/book_{}/index.html", i),
                &format!("Book {}", i),
                "£9.99",
                "Three",
                "media/x.jpg",
            )
        })
        .collect();
    mount_html(&mock_server, "/", listing_page(&products, None), None).await;
    for i in 1..=8 {
        mount_html(
            &mock_server,
            &format!("/catalogue/book_{}/index.html", i),
            detail_page("Poetry", "Book"),
            Some(Duration::from_millis(50)),
        )
        .await;
    }

    let config = create_test_config(&mock_server.uri(), "unused.csv");
    let coordinator = Coordinator::from_config(&config).expect("Failed to build coordinator");
    let result = coordinator.run().await.expect("Crawl failed");

    assert_eq!(result.records().len(), 8);
    assert!(coordinator.pool().peak() <= 2);
    assert_eq!(coordinator.pool().in_flight(), 0);
}
