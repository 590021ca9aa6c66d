//! End-to-end pipeline tests over the in-memory source and writer.

#![allow(clippy::pedantic)]

use sqldoc_import::config::{
    DestinationConfig, FieldCase, ImportConfig, ImportOptions, PostgresConfig, SourceConfig,
};
use sqldoc_import::sink::memory::MemoryWriter;
use sqldoc_import::source::memory::MemorySource;
use sqldoc_import::source::ColumnInfo;
use sqldoc_import::{ColumnKind, Pipeline, SqlValue, TableSchema, Value};

fn config(options: ImportOptions) -> ImportConfig {
    ImportConfig {
        source: SourceConfig::Postgres(PostgresConfig {
            connection_string: "postgres://unused/unused".to_string(),
            schema: "public".to_string(),
        }),
        destination: DestinationConfig {
            url: "http://unused:8092".to_string(),
            bucket: "unused".to_string(),
            username: None,
            password: None,
        },
        options,
    }
}

fn orders_schema() -> TableSchema {
    TableSchema {
        name: "Orders".to_string(),
        columns: vec![
            ColumnInfo {
                name: "OrderId".to_string(),
                kind: ColumnKind::Integer,
            },
            ColumnInfo {
                name: "Total".to_string(),
                kind: ColumnKind::Double,
            },
            ColumnInfo {
                name: "Placed".to_string(),
                kind: ColumnKind::Timestamp,
            },
        ],
        primary_key: vec!["OrderId".to_string()],
    }
}

#[tokio::test]
async fn full_import_with_views_and_type_tags() {
    let source = MemorySource::new().with_table(
        orders_schema(),
        vec![
            vec![
                SqlValue::Int(1),
                SqlValue::Float(9.99),
                SqlValue::Text("2016-03-15 19:04:29.0".to_string()),
            ],
            vec![
                SqlValue::Int(2),
                SqlValue::Float(24.50),
                SqlValue::Text("2016-03-16 08:00:00.0".to_string()),
            ],
        ],
    );
    let writer = MemoryWriter::new();
    let options = ImportOptions {
        type_field: Some("type".to_string()),
        field_case: FieldCase::Lower,
        ..Default::default()
    };

    let mut pipeline = Pipeline::new(config(options), Box::new(source), Box::new(writer.clone()));
    let stats = pipeline.run().await.unwrap();

    assert_eq!(stats.tables_processed, 1);
    assert_eq!(stats.documents_written, 2);

    let docs = writer.documents();
    let first = &docs["Orders:1"];
    assert_eq!(first["orderid"], Value::Integer(1));
    assert_eq!(first["total"], Value::Float(9.99));
    assert_eq!(first["type"], Value::Text("orders".to_string()));

    let views = writer.views();
    assert_eq!(views.len(), 2);
    let by_pk = &views[0];
    assert_eq!(by_pk.design_doc, "Orders");
    assert!(by_pk.map.contains("docType == 'orders'"));
    assert!(by_pk.map.contains("emit(doc.orderid);"));
    assert_eq!(by_pk.reduce, "_count");
    assert_eq!(views[1].name, "by_type");
}

#[tokio::test]
async fn time_series_expansion_end_to_end() {
    let source = MemorySource::new().with_table(
        orders_schema(),
        vec![
            vec![
                SqlValue::Int(1),
                SqlValue::Float(1.0),
                SqlValue::Text("Jan 14, 2016 10:06:35 PM".to_string()),
            ],
            vec![
                SqlValue::Int(2),
                SqlValue::Float(2.0),
                SqlValue::Text("not a date".to_string()),
            ],
        ],
    );
    let writer = MemoryWriter::new();
    let options = ImportOptions {
        create_views: false,
        date_field: Some("Placed".to_string()),
        year_field: Some("Year".to_string()),
        hour_field: Some("Hour".to_string()),
        repeat_count: 3,
        repeat_step_millis: 60_000,
        ..Default::default()
    };

    let mut pipeline = Pipeline::new(config(options), Box::new(source), Box::new(writer.clone()));
    let stats = pipeline.run().await.unwrap();

    // Two rows read, one skipped, three expanded documents written.
    assert_eq!(stats.rows_read, 2);
    assert_eq!(stats.rows_skipped, 1);
    assert_eq!(stats.documents_written, 3);

    let docs = writer.documents();
    let ids: Vec<String> = docs.keys().cloned().collect();
    assert_eq!(ids, vec!["Orders:1_0", "Orders:1_1", "Orders:1_2"]);
    assert_eq!(
        docs["Orders:1_0"]["Placed"],
        Value::DateTime("Jan 14, 2016 10:07:35 PM".to_string())
    );
    assert_eq!(
        docs["Orders:1_2"]["Placed"],
        Value::DateTime("Jan 14, 2016 10:09:35 PM".to_string())
    );
    assert_eq!(docs["Orders:1_1"]["Year"], Value::Integer(2016));
    assert_eq!(docs["Orders:1_1"]["Hour"], Value::Integer(22));
}

#[tokio::test]
async fn multi_table_run_with_one_failure() {
    let line_items = TableSchema {
        name: "line_items".to_string(),
        columns: vec![
            ColumnInfo {
                name: "order_id".to_string(),
                kind: ColumnKind::Integer,
            },
            ColumnInfo {
                name: "sku".to_string(),
                kind: ColumnKind::String,
            },
        ],
        primary_key: vec!["order_id".to_string(), "sku".to_string()],
    };
    let source = MemorySource::new()
        .with_table(orders_schema(), vec![vec![SqlValue::Int(1)]])
        .with_table(
            line_items,
            vec![vec![SqlValue::Int(1), SqlValue::Text("A-1".to_string())]],
        )
        .with_failing_table("Orders");
    let writer = MemoryWriter::new();

    let mut pipeline = Pipeline::new(
        config(ImportOptions::default()),
        Box::new(source),
        Box::new(writer.clone()),
    );
    let stats = pipeline.run().await.unwrap();

    assert_eq!(stats.tables_failed, 1);
    assert_eq!(stats.tables_processed, 1);
    assert!(writer.documents().contains_key("line_items:1"));

    // The composite key view still covers both tables, and by_type is global.
    let views = writer.views();
    let line_view = views.iter().find(|v| v.design_doc == "line_items").unwrap();
    assert!(line_view.map.contains("emit([doc.order_id, doc.sku]);"));
    assert_eq!(views.iter().filter(|v| v.name == "by_type").count(), 1);
}
