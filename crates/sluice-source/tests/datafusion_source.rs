use std::fs;

use datafusion::arrow::array::AsArray;
use datafusion::arrow::datatypes::Float64Type;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sluice_source::discovery::discover_sources;
use sluice_source::error::SourceError;
use sluice_source::execute_source;
use sluice_source::registry::RunnerRegistry;

fn write_source(root: &std::path::Path) {
    let orders = root.join("orders");
    fs::create_dir_all(orders.join("reports")).unwrap();
    fs::write(
        orders.join("connection.yaml"),
        "name: orders\ntype: datafusion\noptions:\n  batchSize: 2\n",
    )
    .unwrap();
    fs::write(
        orders.join("orders.csv"),
        "id,region,amount\n1,east,10.5\n2,west,3\n3,east,1.5\n4,north,7\n",
    )
    .unwrap();
    fs::write(
        orders.join("reports").join("by_region.sql"),
        "SELECT region, SUM(amount) AS total FROM orders GROUP BY region ORDER BY region",
    )
    .unwrap();
    fs::write(
        orders.join("setup.sql"),
        "CREATE VIEW big_orders AS SELECT * FROM orders WHERE amount > 5",
    )
    .unwrap();
}

#[tokio::test]
async fn test_datafusion_source_end_to_end() {
    let sources = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_source(sources.path());

    let specs = discover_sources(sources.path()).unwrap();
    assert_eq!(specs.len(), 1);
    let paths = execute_source(&specs[0], &RunnerRegistry::new(), output.path())
        .await
        .unwrap();

    assert_eq!(paths, vec!["/orders/reports/by_region.parquet"]);
    assert!(!output.path().join("orders/setup.parquet").exists());

    let schema =
        fs::read_to_string(output.path().join("orders/reports/by_region.schema.json")).unwrap();
    assert_eq!(
        schema,
        r#"[{"name":"region","evidenceType":"string","typeFidelity":"precise"},{"name":"total","evidenceType":"number","typeFidelity":"precise"}]"#
    );

    let data = bytes::Bytes::from(
        fs::read(output.path().join("orders/reports/by_region.parquet")).unwrap(),
    );
    let batches = ParquetRecordBatchReaderBuilder::try_new(data)
        .unwrap()
        .build()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let mut regions = vec![];
    let mut totals = vec![];
    for batch in &batches {
        let region = batch.column(0).as_string::<i32>();
        let total = batch.column(1).as_primitive::<Float64Type>();
        for i in 0..batch.num_rows() {
            regions.push(region.value(i).to_string());
            totals.push(total.value(i));
        }
    }
    assert_eq!(regions, vec!["east", "north", "west"]);
    assert_eq!(totals, vec![12.0, 7.0, 3.0]);
}

#[tokio::test]
async fn test_datafusion_query_error_propagates() {
    let sources = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_source(sources.path());
    fs::write(
        sources.path().join("orders").join("broken.sql"),
        "SELECT missing_column FROM orders",
    )
    .unwrap();

    let specs = discover_sources(sources.path()).unwrap();
    let error = execute_source(&specs[0], &RunnerRegistry::new(), output.path())
        .await
        .unwrap_err();

    assert!(matches!(error, SourceError::DataFusion(_)));
    assert!(!output.path().join("orders").exists());
}

#[tokio::test]
async fn test_datafusion_invalid_options() {
    let sources = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_source(sources.path());
    fs::write(
        sources.path().join("orders").join("connection.yaml"),
        "type: datafusion\noptions:\n  threads: 4\n",
    )
    .unwrap();

    let specs = discover_sources(sources.path()).unwrap();
    let error = execute_source(&specs[0], &RunnerRegistry::new(), output.path())
        .await
        .unwrap_err();

    assert!(matches!(error, SourceError::RunnerInstantiation(_)));
}
