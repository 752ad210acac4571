//! Storefront catalog command-line entry point.
//!
//! # Responsibility
//! - Load `.env` and `STOREFRONT_*` configuration, then open the catalog.
//! - Expose create/list commands over the core services and print JSON.
//!
//! Usage:
//! - `storefront_cli version`
//! - `storefront_cli create '<product draft json>'`
//! - `storefront_cli products|colours|materials [page] [page_size]`
//! - `storefront_cli category <sub_category_id> [page] [page_size]`

use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::process::ExitCode;
use storefront_core::db::open_shared;
use storefront_core::{
    core_version, init_logging, parse_page_params, AttributeService, ProductDraft,
    ProductService, RequestContext, SqliteAttributeRepository, SqliteProductRepository,
    StorefrontConfig,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> CliResult<()> {
    let command = args.first().map(String::as_str).unwrap_or("version");
    if command == "version" {
        println!("storefront_core version={}", core_version());
        return Ok(());
    }

    let config = StorefrontConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }
    info!(
        "event=cli_run module=cli status=start command={command} db_path={}",
        config.db_path.display()
    );

    let conn = open_shared(&config.db_path)?;
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let product_service = ProductService::new(&products, &attributes, &attributes, &config);
    let attribute_service = AttributeService::new(&attributes, &config);

    match command {
        "create" => {
            let raw = args.get(1).ok_or("create expects a product draft as JSON")?;
            let draft: ProductDraft = serde_json::from_str(raw)?;
            let product = product_service.create_product(&RequestContext::new(), &draft)?;
            print_json(&product)
        }
        "products" => {
            let (page, page_size) = page_args(&args[1..]);
            print_json(&product_service.list_products(page, page_size)?)
        }
        "category" => {
            let category_id = args.get(1).ok_or("category expects a sub-category id")?;
            let (page, page_size) = page_args(&args[2..]);
            print_json(&product_service.list_products_by_category(category_id, page, page_size)?)
        }
        "colours" => {
            let (page, page_size) = page_args(&args[1..]);
            print_json(&attribute_service.list_colours(page, page_size)?)
        }
        "materials" => {
            let (page, page_size) = page_args(&args[1..]);
            print_json(&attribute_service.list_materials(page, page_size)?)
        }
        other => Err(format!("unknown command `{other}`").into()),
    }
}

fn page_args(args: &[String]) -> (i32, i32) {
    let page = args.first().map(String::as_str).unwrap_or("");
    let page_size = args.get(1).map(String::as_str).unwrap_or("");
    parse_page_params(page, page_size)
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
