use chrono::NaiveDate;
use marketdata_api::{ChartQuery, Client, Error, Range};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn since_1980() -> ChartQuery {
    ChartQuery::since(NaiveDate::from_ymd_opt(1980, 1, 1).unwrap())
}

#[tokio::test]
async fn get_chart_success() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("chart_aapl.json");

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .and(query_param("period1", "315532800"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client =
        Client::with_base_url(&format!("{}/v8/finance/chart", mock_server.uri())).unwrap();
    let result = client.get_chart("AAPL", &since_1980()).await.unwrap();

    let chart = result.expect("chart result present");
    assert_eq!(chart.closes().len(), 3);
}

#[tokio::test]
async fn get_chart_with_range() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("chart_aapl.json");

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/SPY"))
        .and(query_param("range", "5y"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client =
        Client::with_base_url(&format!("{}/v8/finance/chart", mock_server.uri())).unwrap();
    let result = client
        .get_chart("SPY", &ChartQuery::range(Range::FiveYears))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn get_chart_unknown_symbol() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ZZZZ"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(load_fixture("chart_not_found.json")),
        )
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client.get_chart("ZZZZ", &since_1980()).await;
    match result {
        Err(Error::Provider { code, description }) => {
            assert_eq!(code, "Not Found");
            assert!(description.contains("delisted"));
        }
        other => panic!("expected provider error, got {:?}", other.map(|r| r.is_some())),
    }
}

#[tokio::test]
async fn get_chart_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/NEWCO"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"chart":{"result":[],"error":null}}"#),
        )
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client.get_chart("NEWCO", &since_1980()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn get_chart_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AAPL"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client.get_chart("AAPL", &since_1980()).await;
    assert!(matches!(result, Err(Error::RateLimited)));
}

#[tokio::test]
async fn get_chart_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AAPL"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client.get_chart("AAPL", &since_1980()).await;
    assert!(matches!(result, Err(Error::HttpStatus { status: 502, .. })));
}

#[tokio::test]
async fn get_chart_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not valid json}"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client.get_chart("AAPL", &since_1980()).await;
    assert!(matches!(result, Err(Error::Parse(_))));
}
