use std::path::Path;

use rover_core::Department;
use rover_import::{parse_products_fixed, parse_products_mapped, ParsedProduct, ProductLayout};

use super::{load_rows, MappingArgs};

/// Import a department price list, replacing the department's standard
/// products wholesale. Displays and palettes are not touched.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the department, layout or
/// mapping is invalid, or the replacement transaction fails.
pub(crate) async fn run_import_products(
    pool: &sqlx::PgPool,
    file: &Path,
    department: &str,
    layout: Option<&str>,
    mapping: &MappingArgs,
    dry_run: bool,
) -> anyhow::Result<()> {
    let department: Department = department.trim().to_ascii_lowercase().parse()?;
    let rows = load_rows(file)?;

    let products = match mapping.resolve()? {
        Some(mapping) => {
            if layout.is_some() {
                anyhow::bail!("--layout and the column mapping flags are mutually exclusive");
            }
            parse_products_mapped(&rows, department, &mapping)?
        }
        None => {
            let layout = match layout {
                Some(raw) => parse_layout(raw)?,
                None => default_layout(department),
            };
            parse_products_fixed(&rows, layout)?
        }
    };
    if products.is_empty() {
        anyhow::bail!("no usable product rows in '{}'", file.display());
    }

    if dry_run {
        println!(
            "dry-run: would replace {} {department} products",
            products.len()
        );
        for product in products.iter().take(10) {
            println!("  {:<32}{:<12}{:>8}", product.name, product.weight, product.price);
        }
        if products.len() > 10 {
            println!("  ... and {} more", products.len() - 10);
        }
        return Ok(());
    }

    let items: Vec<rover_db::ImportedProduct> = products.iter().map(to_imported).collect();
    let (deleted, inserted) = rover_db::replace_department_products(pool, department, &items).await?;
    println!("replaced {department} products: {deleted} removed, {inserted} inserted");
    Ok(())
}

fn parse_layout(raw: &str) -> anyhow::Result<ProductLayout> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pets-standard" => Ok(ProductLayout::PetsStandard),
        "food-standard" => Ok(ProductLayout::FoodStandard),
        other => anyhow::bail!("unknown layout '{other}'; expected pets-standard or food-standard"),
    }
}

fn default_layout(department: Department) -> ProductLayout {
    match department {
        Department::Pets => ProductLayout::PetsStandard,
        Department::Food => ProductLayout::FoodStandard,
    }
}

fn to_imported(product: &ParsedProduct) -> rover_db::ImportedProduct {
    rover_db::ImportedProduct {
        name: product.name.clone(),
        weight: product.weight.clone(),
        content: product.content.clone(),
        pallet_size: product.pallet_size.and_then(|size| i32::try_from(size).ok()),
        price: product.price,
        artikel_nr: product.artikel_nr.clone(),
        sku: product.sku.clone(),
    }
}
