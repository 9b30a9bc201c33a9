//! End-to-end flows through the command layer: startup, gate, ledger,
//! reports and persistence.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use stock_cli::cli::{self, Cli, Output};
use stock_cli::commands::{auth, backup, movement, product, report, sale};
use stock_cli::error::ErrorCode;
use stock_cli::state::{ConfigState, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD};
use stock_cli::App;
use stock_core::{
    Capability, MovementInput, MovementKind, PaymentMode, Permissions, ProductInput, Role, SaleInput,
};

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("stockbook-it-{}", uuid::Uuid::new_v4()))
}

async fn admin_app() -> App {
    let app = App::in_memory(ConfigState::with_data_dir(temp_dir())).await.unwrap();
    auth::login(&app.db, &app.session, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD)
        .await
        .unwrap();
    app
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

fn rice(initial_stock: i64, min_stock: i64) -> ProductInput {
    ProductInput {
        code: "RIZ25".into(),
        name: "Rice 25kg".into(),
        category: Some("Food".into()),
        initial_stock,
        min_stock,
        unit_price_cents: 15_000,
        ..Default::default()
    }
}

fn sale_of(product_id: i64, quantity: i64, unit: i64, paid: i64, client: &str) -> SaleInput {
    SaleInput {
        date: day(3),
        product_id: Some(product_id),
        quantity,
        unit_price_cents: unit,
        payment_mode: Some(PaymentMode::Cash),
        client_name: Some(client.into()),
        client_phone: None,
        paid_amount_cents: paid,
        comment: None,
    }
}

async fn stock_of(app: &App, product_id: i64) -> i64 {
    product::list_stock(&app.db, &app.session)
        .await
        .unwrap()
        .into_iter()
        .find(|level| level.product_id == product_id)
        .map(|level| level.current_stock)
        .unwrap()
}

#[tokio::test]
async fn sale_lowers_stock_and_records_one_exit() {
    let app = admin_app().await;
    let rice = product::create_product(&app.db, &app.session, rice(10, 2)).await.unwrap();

    movement::record_movement(
        &app.db,
        &app.session,
        MovementInput {
            date: day(1),
            kind: MovementKind::Entree,
            product_id: Some(rice.id),
            quantity: 5,
            unit_price_cents: None,
            client_name: None,
            client_phone: None,
            comment: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(stock_of(&app, rice.id).await, 15);

    let sold = sale::record_sale(&app.db, &app.session, sale_of(rice.id, 3, 1000, 1000, "Awa"))
        .await
        .unwrap();
    assert_eq!(sold.total_cents, 3000);
    assert_eq!(sold.balance_cents, 2000);
    assert_eq!(stock_of(&app, rice.id).await, 12);

    let movements = movement::list_movements(&app.db, &app.session).await.unwrap();
    let exits: Vec<_> = movements.iter().filter(|m| m.kind == MovementKind::Sortie).collect();
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].quantity, 3);
    assert_eq!(exits[0].product_id, rice.id);
}

#[tokio::test]
async fn debtors_group_outstanding_balances() {
    let app = admin_app().await;
    let rice = product::create_product(&app.db, &app.session, rice(100, 0)).await.unwrap();

    // A: 1000 with 400 due, 500 settled. B: 200 all due.
    sale::record_sale(&app.db, &app.session, sale_of(rice.id, 2, 500, 600, "A")).await.unwrap();
    sale::record_sale(&app.db, &app.session, sale_of(rice.id, 1, 500, 500, "A")).await.unwrap();
    sale::record_sale(&app.db, &app.session, sale_of(rice.id, 1, 200, 0, "B")).await.unwrap();

    let debtors = report::debtors(&app.db, &app.session).await.unwrap();
    assert_eq!(debtors.len(), 2);
    assert_eq!(debtors[0].client_name, "A");
    assert_eq!(debtors[0].total_balance_cents, 400);
    assert_eq!(debtors[0].sale_count, 1);
    assert_eq!(debtors[1].client_name, "B");
    assert_eq!(debtors[1].total_balance_cents, 200);
    assert_eq!(debtors[1].sale_count, 1);

    // Reads do not change anything
    let again = report::debtors(&app.db, &app.session).await.unwrap();
    assert_eq!(debtors, again);
    let dash = report::dashboard(&app.db, &app.session).await.unwrap();
    assert_eq!(dash, report::dashboard(&app.db, &app.session).await.unwrap());
    assert_eq!(dash.sales.total_debt_cents, 600);
    assert_eq!(dash.sales.debtor_count, 2);
}

#[tokio::test]
async fn low_stock_threshold_is_inclusive() {
    let app = admin_app().await;
    let at = product::create_product(&app.db, &app.session, rice(5, 5)).await.unwrap();
    let mut above_input = rice(6, 5);
    above_input.code = "RIZ50".into();
    let above = product::create_product(&app.db, &app.session, above_input).await.unwrap();

    let levels = product::list_stock(&app.db, &app.session).await.unwrap();
    let flag = |id: i64| levels.iter().find(|l| l.product_id == id).unwrap().is_low_stock;
    assert!(flag(at.id));
    assert!(!flag(above.id));
}

#[tokio::test]
async fn missing_capability_denies_view_and_write() {
    let app = admin_app().await;
    let rice = product::create_product(&app.db, &app.session, rice(10, 0)).await.unwrap();

    let clerk = auth::register(&app.db, &app.session, "clerk@shop.local", "clerk-pass", Role::User)
        .await
        .unwrap();
    auth::set_permissions(
        &app.db,
        &app.session,
        clerk.id,
        Permissions::all_granted().with(Capability::Sales, false),
    )
    .await
    .unwrap();

    auth::login(&app.db, &app.session, "clerk@shop.local", "clerk-pass").await.unwrap();

    let err = sale::record_sale(&app.db, &app.session, sale_of(rice.id, 1, 100, 100, "C"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);
    let err = sale::list_sales(&app.db, &app.session).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    assert!(app.db.inner().sales().list().await.unwrap().is_empty());
    assert_eq!(stock_of(&app, rice.id).await, 10);
}

#[tokio::test]
async fn wrong_current_password_changes_nothing() {
    let app = admin_app().await;

    let err = auth::change_credentials(&app.db, &app.session, "not-it", Some("new@shop.local"), Some("newpass1"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthFailure);

    // Still logged in, old credential still valid
    assert!(auth::whoami(&app.session).await.is_ok());
    auth::logout(&app.session).await;
    auth::login(&app.db, &app.session, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn login_failures_look_the_same() {
    let app = App::in_memory(ConfigState::with_data_dir(temp_dir())).await.unwrap();

    let unknown = auth::login(&app.db, &app.session, "ghost@shop.local", DEFAULT_ADMIN_PASSWORD)
        .await
        .unwrap_err();
    let wrong = auth::login(&app.db, &app.session, DEFAULT_ADMIN_EMAIL, "wrong-pass")
        .await
        .unwrap_err();
    assert_eq!(unknown.code, ErrorCode::AuthFailure);
    assert_eq!(unknown.message, wrong.message);
    assert!(app.session.current().await.is_none());
}

#[tokio::test]
async fn store_and_session_survive_restart() {
    let dir = temp_dir();

    let app = App::start(ConfigState::with_data_dir(&dir)).await.unwrap();
    auth::login(&app.db, &app.session, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD)
        .await
        .unwrap();
    let rice = product::create_product(&app.db, &app.session, rice(7, 1)).await.unwrap();
    sale::record_sale(&app.db, &app.session, sale_of(rice.id, 2, 100, 0, "D")).await.unwrap();
    app.shutdown().await;

    let app = App::start(ConfigState::with_data_dir(&dir)).await.unwrap();
    let identity = auth::whoami(&app.session).await.unwrap();
    assert_eq!(identity.user.email, DEFAULT_ADMIN_EMAIL);
    assert_eq!(stock_of(&app, rice.id).await, 5);
    // Bootstrap does not run twice
    assert_eq!(app.db.inner().users().count().await.unwrap(), 1);
    app.shutdown().await;

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn read_only_run_leaves_snapshot_alone() {
    let dir = temp_dir();
    let config = ConfigState::with_data_dir(&dir);

    // First start seeds the administrator and commits.
    App::start(config.clone()).await.unwrap().shutdown().await;
    let slot = config.snapshot_slot();
    assert!(slot.load().await.unwrap().is_some());

    let app = App::start(config.clone()).await.unwrap();
    slot.clear().await.unwrap();

    auth::login(&app.db, &app.session, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD)
        .await
        .unwrap();
    product::list_products(&app.db, &app.session).await.unwrap();
    let missing = product::delete_product(&app.db, &app.session, 999).await.unwrap_err();
    assert_eq!(missing.code, ErrorCode::NotFound);
    app.shutdown().await;

    assert!(slot.load().await.unwrap().is_none());

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn backup_restores_earlier_state() {
    let app = admin_app().await;
    let rice = product::create_product(&app.db, &app.session, rice(4, 0)).await.unwrap();

    let dir = temp_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("shop.backup");

    let exported = backup::export_backup(&app.db, &app.session, &file).await.unwrap();
    assert!(exported.bytes > 0);

    sale::record_sale(&app.db, &app.session, sale_of(rice.id, 4, 100, 400, "E")).await.unwrap();
    assert_eq!(stock_of(&app, rice.id).await, 0);

    backup::import_backup(&app.db, &app.session, &file).await.unwrap();
    assert_eq!(stock_of(&app, rice.id).await, 4);
    assert!(sale::list_sales(&app.db, &app.session).await.unwrap().is_empty());

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn cli_dispatch_runs_commands() {
    let app = admin_app().await;

    let add = Cli::try_parse_from(["stockbook", "products", "add", "SUC1", "Sugar 1kg", "--initial-stock", "3"]).unwrap();
    assert!(matches!(cli::run(&app, add.command).await.unwrap(), Output::Json(_)));

    let shop = Cli::try_parse_from(["stockbook", "shop"]).unwrap();
    match cli::run(&app, shop.command).await.unwrap() {
        Output::Json(value) => {
            let items = value.as_array().unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0]["currentStock"], 3);
        }
        Output::Text(text) => panic!("unexpected text output: {}", text),
    }

    let logout = Cli::try_parse_from(["stockbook", "logout"]).unwrap();
    cli::run(&app, logout.command).await.unwrap();
    let stock = Cli::try_parse_from(["stockbook", "stock"]).unwrap();
    let err = cli::run(&app, stock.command).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);
}
