//! Chart registry: creation rules, ownership and public sharing.

use fluxion::AppError;
use fluxion::charts::ChartDraft;
use fluxion::models::{ChartConfig, Dataset, User};
use indexmap::IndexMap;
use serde_json::json;
use std::time::Duration;

mod common;
use common::*;

async fn alice_with_dataset(env: &TestEnv) -> (User, Dataset) {
    let alice = create_user(env, "alice").await;
    let dataset = env
        .datasets
        .ingest(upload("sales.csv", SALES_CSV), alice.id)
        .await
        .unwrap();
    (alice, dataset)
}

fn draft(dataset_id: i64) -> ChartDraft {
    ChartDraft {
        title: Some("Sales by region".into()),
        chart_type: Some("bar".into()),
        dataset_id: Some(dataset_id),
        config: ChartConfig {
            x_axis: Some("region".into()),
            y_axis: Some("amount".into()),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn config_round_trips_exactly() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;

    let mut options = IndexMap::new();
    options.insert("stacked".to_string(), json!(true));
    options.insert("palette".to_string(), json!(["#111", "#222"]));
    options.insert("axis".to_string(), json!({ "min": 0, "max": 250.5 }));
    let config = ChartConfig {
        x_axis: Some("region".into()),
        y_axis: Some("amount".into()),
        value_column: None,
        label_column: Some("region".into()),
        color_scheme: "ocean".into(),
        chart_options: options,
    };

    let chart = env
        .charts
        .create(
            ChartDraft {
                config: config.clone(),
                ..draft(dataset.id)
            },
            alice.id,
        )
        .await
        .unwrap();

    let view = env.charts.fetch(chart.id, alice.id).await.unwrap();
    assert_eq!(view.config, config);
    assert_eq!(view.title, "Sales by region");
    assert_eq!(view.chart_type, "bar");
    assert!(!view.is_public);
    assert_eq!(view.share_token, None);
    assert_eq!(view.created_at, view.updated_at);
}

#[tokio::test]
async fn defaults_for_title_and_type() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;

    let chart = env
        .charts
        .create(
            ChartDraft {
                title: Some("   ".into()),
                chart_type: None,
                dataset_id: Some(dataset.id),
                config: ChartConfig::default(),
            },
            alice.id,
        )
        .await
        .unwrap();

    assert_eq!(chart.title, "Untitled Chart");
    assert_eq!(chart.chart_type, "bar");
    assert_eq!(chart.config.0.color_scheme, "default");
}

#[tokio::test]
async fn invalid_definitions_are_rejected() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;

    let bad_type = ChartDraft {
        chart_type: Some("donut".into()),
        ..draft(dataset.id)
    };
    assert!(matches!(
        env.charts.create(bad_type, alice.id).await,
        Err(AppError::Validation(_))
    ));

    let long_title = ChartDraft {
        title: Some("t".repeat(256)),
        ..draft(dataset.id)
    };
    assert!(matches!(
        env.charts.create(long_title, alice.id).await,
        Err(AppError::Validation(_))
    ));

    let no_dataset = ChartDraft {
        dataset_id: None,
        ..draft(dataset.id)
    };
    assert!(matches!(
        env.charts.create(no_dataset, alice.id).await,
        Err(AppError::Validation(_))
    ));

    assert!(matches!(
        env.charts.create(draft(dataset.id + 50), alice.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(env.charts.list(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn charts_cannot_point_at_someone_elses_dataset() {
    let env = setup().await;
    let (_alice, dataset) = alice_with_dataset(&env).await;
    let bob = create_user(&env, "bob").await;

    assert!(matches!(
        env.charts.create(draft(dataset.id), bob.id).await,
        Err(AppError::Forbidden)
    ));
    assert!(env.charts.list(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_embeds_the_dataset() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;
    let chart = env.charts.create(draft(dataset.id), alice.id).await.unwrap();

    let view = env.charts.fetch(chart.id, alice.id).await.unwrap();
    let embedded = view.dataset.unwrap();
    assert_eq!(embedded.id, dataset.id);
    assert_eq!(embedded.filename, "sales.csv");
    assert_eq!(embedded.preview[1]["amount"], json!(""));
}

#[tokio::test]
async fn other_users_are_forbidden_everywhere() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;
    let bob = create_user(&env, "bob").await;
    let chart = env.charts.create(draft(dataset.id), alice.id).await.unwrap();

    assert!(matches!(
        env.charts.fetch(chart.id, bob.id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        env.charts.delete(chart.id, bob.id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        env.charts.share(chart.id, bob.id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        env.charts.unshare(chart.id, bob.id).await,
        Err(AppError::Forbidden)
    ));

    // Nothing changed.
    let view = env.charts.fetch(chart.id, alice.id).await.unwrap();
    assert!(!view.is_public);
    assert_eq!(view.share_token, None);
}

#[tokio::test]
async fn share_is_idempotent_and_unshare_hides_the_chart() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;
    let chart = env.charts.create(draft(dataset.id), alice.id).await.unwrap();

    let token = env.charts.share(chart.id, alice.id).await.unwrap();
    assert_eq!(token.len(), 43);
    assert_eq!(env.charts.share(chart.id, alice.id).await.unwrap(), token);

    let public = env.charts.view_public(&token).await.unwrap();
    assert_eq!(public.id, chart.id);
    assert!(public.is_public);
    assert!(public.dataset.is_some());

    env.charts.unshare(chart.id, alice.id).await.unwrap();
    assert!(matches!(
        env.charts.view_public(&token).await,
        Err(AppError::NotFound(_))
    ));

    // The token survives and is reused on the next share.
    let view = env.charts.fetch(chart.id, alice.id).await.unwrap();
    assert_eq!(view.share_token.as_deref(), Some(token.as_str()));
    assert_eq!(env.charts.share(chart.id, alice.id).await.unwrap(), token);
    assert!(env.charts.view_public(&token).await.is_ok());
}

#[tokio::test]
async fn share_and_unshare_advance_updated_at() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;
    let chart = env.charts.create(draft(dataset.id), alice.id).await.unwrap();
    assert_eq!(chart.updated_at, chart.created_at);

    tokio::time::sleep(Duration::from_millis(20)).await;
    env.charts.share(chart.id, alice.id).await.unwrap();
    let shared = env.charts.fetch(chart.id, alice.id).await.unwrap();
    assert!(shared.updated_at > chart.updated_at);
    assert_eq!(shared.created_at, chart.created_at);

    tokio::time::sleep(Duration::from_millis(20)).await;
    env.charts.unshare(chart.id, alice.id).await.unwrap();
    let unshared = env.charts.fetch(chart.id, alice.id).await.unwrap();
    assert!(unshared.updated_at > shared.updated_at);
    assert!(!unshared.is_public);

    tokio::time::sleep(Duration::from_millis(20)).await;
    env.charts.share(chart.id, alice.id).await.unwrap();
    let reshared = env.charts.fetch(chart.id, alice.id).await.unwrap();
    assert!(reshared.updated_at > unshared.updated_at);
}

#[tokio::test]
async fn unknown_tokens_are_not_found() {
    let env = setup().await;
    assert!(matches!(
        env.charts.view_public("no-such-token").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_and_list() {
    let env = setup().await;
    let (alice, dataset) = alice_with_dataset(&env).await;
    let first = env.charts.create(draft(dataset.id), alice.id).await.unwrap();
    let second = env
        .charts
        .create(
            ChartDraft {
                title: Some("Second".into()),
                chart_type: Some("pie".into()),
                ..draft(dataset.id)
            },
            alice.id,
        )
        .await
        .unwrap();

    let listed: Vec<i64> = env
        .charts
        .list(alice.id)
        .await
        .unwrap()
        .iter()
        .map(|chart| chart.id)
        .collect();
    assert_eq!(listed, [second.id, first.id]);

    env.charts.delete(first.id, alice.id).await.unwrap();
    assert!(matches!(
        env.charts.fetch(first.id, alice.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(env.charts.list(alice.id).await.unwrap().len(), 1);
    // Deleting a chart leaves its dataset alone.
    assert!(env.datasets.find(dataset.id).await.unwrap().is_some());
}
