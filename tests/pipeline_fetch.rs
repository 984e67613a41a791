use std::error::Error;
use std::fs;

use pipedag::config::{ConfigFile, PipelineSection, RunSection};
use pipedag::engine::Executor;
use pipedag::pipeline::{self, fetch::fetch_to_file};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn fetch_writes_response_body_to_file() -> TestResult {
    let mut server = mockito::Server::new_async().await;
    let body = "Country Name,Year,Value\nChina,2019,1404910000\n";
    let mock = server
        .mock("GET", "/population.csv")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let dir = tempdir()?;
    let dest = dir.path().join("nested/raw_population.csv");

    let client = reqwest::Client::new();
    fetch_to_file(&client, &format!("{}/population.csv", server.url()), &dest).await?;

    mock.assert_async().await;
    assert_eq!(fs::read_to_string(&dest)?, body);

    Ok(())
}

#[tokio::test]
async fn fetch_fails_on_http_error_status() -> TestResult {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/population.csv")
        .with_status(500)
        .create_async()
        .await;

    let dir = tempdir()?;
    let dest = dir.path().join("raw_population.csv");

    let client = reqwest::Client::new();
    let err = fetch_to_file(&client, &format!("{}/population.csv", server.url()), &dest)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("population.csv"));
    assert!(!dest.exists());

    Ok(())
}

#[tokio::test]
async fn full_pipeline_run_against_mock_server_writes_report() -> TestResult {
    let mut server = mockito::Server::new_async().await;
    let _population = server
        .mock("GET", "/population.csv")
        .with_status(200)
        .with_body(
            "Country Name,Country Code,Year,Value\n\
             China,CHN,2019,1404910000\n\
             India,IND,2019,1366000000\n",
        )
        .create_async()
        .await;
    let _gdp = server
        .mock("GET", "/gdp.csv")
        .with_status(200)
        .with_body(
            "Country Name,Country Code,Year,Value\n\
             China,CHN,2019,14280000000000\n\
             India,IND,2019,2870000000000\n",
        )
        .create_async()
        .await;

    let dir = tempdir()?;
    let cfg = ConfigFile {
        pipeline: PipelineSection {
            population_url: format!("{}/population.csv", server.url()),
            gdp_url: format!("{}/gdp.csv", server.url()),
            work_dir: dir.path().join("work"),
            report_path: None,
        },
        run: RunSection {
            max_attempts: 2,
            retry_delay: "10ms".to_string(),
            concurrency: None,
        },
    };

    let graph = pipeline::build_graph(&cfg)?;
    let report = Executor::new().run(&graph).await;

    assert!(report.is_success(), "run failed:\n{}", report.render());

    let text = fs::read_to_string(cfg.pipeline.report_file())?;
    assert!(text.starts_with("Top 5 countries by combined population"));
    assert!(text.contains("China: 1,404,910,000"));
    assert!(text.contains("India: 1,366,000,000"));

    Ok(())
}
