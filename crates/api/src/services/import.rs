//! Product import from Excel workbooks.
//!
//! The first worksheet is read; row 1 holds headers. Headers are normalized
//! and mapped through an alias table, so `Title (Arabic)`, `title_ar` and
//! `TitleArabic` all land on the same field.

use std::collections::HashMap;
use std::io::Cursor;
use std::str::FromStr;

use calamine::{Data, Reader, Xlsx};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use skinior_core::{BrandId, CategoryId, CurrencyCode, Slug, UserId, round_money};

use crate::cache::CatalogCache;
use crate::db::RepositoryError;
use crate::db::catalog::{BrandRepository, CategoryRepository, ProductRepository, import_product};
use crate::db::imports::ImportLogRepository;
use crate::models::catalog::{BrandInput, CategoryInput, ImageInput, ProductInput};
use crate::models::import::{ImportOptions, ImportReport, RowIssue};
use crate::services::catalog::unique_slug;

const MAX_SKU_LENGTH: usize = 100;
const MAX_BARCODE_LENGTH: usize = 50;

/// Errors that abort an import before any row is processed.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read workbook: {0}")]
    Workbook(String),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("the sheet must contain a header row and at least one data row")]
    TooFewRows,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A spreadsheet cell reduced to what the importer cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&Data> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::Bool(b) => Self::Bool(*b),
            Data::DateTime(dt) => Self::Number(dt.as_f64()),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                if s.trim().is_empty() {
                    Self::Empty
                } else {
                    Self::Text(s.clone())
                }
            }
            Data::Error(_) | Data::Empty => Self::Empty,
        }
    }
}

impl CellValue {
    const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Trimmed text; whole numbers print without a fraction.
    fn text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{n:.0}")),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
        }
    }

    fn decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) if n.is_finite() => Decimal::from_str(&n.to_string()).ok(),
            Self::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    fn boolean(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) if *n == 1.0 => Some(true),
            Self::Number(n) if *n == 0.0 => Some(false),
            Self::Text(s) => parse_bool(s),
            _ => None,
        }
    }

    fn list(&self) -> Vec<String> {
        self.text().map(|t| split_list(&t)).unwrap_or_default()
    }
}

/// `true/1/yes/y/on` and `false/0/no/n/off`, any case.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Comma-separated values, trimmed, blanks dropped.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Map a header cell to its field name.
///
/// Lowercases, strips `*`, `(`, `)`, `_`, `-` and whitespace, then applies
/// the alias table. Unknown headers come back normalized.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    let key: String = header
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '*' | '(' | ')' | '-' | '_') && !c.is_whitespace())
        .collect();

    let field = match key.as_str() {
        "title" | "name" | "productname" => "title",
        "titlearabic" | "titleinarabic" | "titlear" => "title_ar",
        "description" | "descriptionenglish" | "descriptionen" => "description_en",
        "descriptionarabic" | "descriptionar" => "description_ar",
        "price" => "price",
        "compareatprice" | "compareprice" => "compare_at_price",
        "currency" => "currency",
        "sku" => "sku",
        "barcode" => "barcode",
        "isactive" | "active" => "is_active",
        "isfeatured" | "featured" => "is_featured",
        "isnew" | "new" => "is_new",
        "stockquantity" | "stock" | "quantity" => "stock_quantity",
        "categoryname" | "category" => "category",
        "brandname" | "brand" => "brand",
        "activeingredients" => "active_ingredients",
        "skintype" | "skintypes" => "skin_types",
        "usage" => "usage",
        "concerns" => "concerns",
        "features" => "features",
        "featuresarabic" | "featuresar" => "features_ar",
        "ingredients" | "ingredientslist" => "ingredients",
        "ingredientsarabic" | "ingredientsar" => "ingredients_ar",
        "howtouse" => "how_to_use",
        "howtousearabic" | "howtousear" => "how_to_use_ar",
        "metatitle" => "meta_title",
        "metadescription" => "meta_description",
        "imageurls" | "images" | "imageurl" => "image_urls",
        "attributes" => "attributes",
        _ => return key,
    };
    field.to_owned()
}

/// A data row keyed by normalized header.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// Spreadsheet row number (header = 1).
    pub row: usize,
    pub cells: HashMap<String, CellValue>,
}

impl SheetRow {
    fn get(&self, field: &str) -> &CellValue {
        self.cells.get(field).unwrap_or(&CellValue::Empty)
    }

    fn text(&self, field: &str) -> Option<String> {
        self.get(field).text()
    }
}

/// Turn raw sheet rows into keyed data rows, skipping fully empty rows.
///
/// `first_row` is the 0-based sheet index of the header row (`rows[0]`); data rows
/// are reported with the 1-based row number a spreadsheet shows.
///
/// # Errors
///
/// Returns `ImportError::TooFewRows` without a header and a non-empty data row.
pub fn sheet_rows(rows: &[Vec<CellValue>], first_row: usize) -> Result<Vec<SheetRow>, ImportError> {
    let Some((header, data)) = rows.split_first() else {
        return Err(ImportError::TooFewRows);
    };
    let headers: Vec<String> = header
        .iter()
        .map(|cell| cell.text().map(|t| normalize_header(&t)).unwrap_or_default())
        .collect();

    let parsed: Vec<SheetRow> = data
        .iter()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.is_empty()))
        .map(|(index, cells)| SheetRow {
            row: first_row + index + 2,
            cells: headers
                .iter()
                .zip(cells)
                .filter(|(h, c)| !h.is_empty() && !c.is_empty())
                .map(|(h, c)| (h.clone(), c.clone()))
                .collect(),
        })
        .collect();

    if parsed.is_empty() {
        return Err(ImportError::TooFewRows);
    }
    Ok(parsed)
}

/// Read the first worksheet of an `.xlsx` file.
///
/// # Errors
///
/// Returns `ImportError::Workbook` if the bytes are not a readable workbook.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Vec<SheetRow>, ImportError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes)).map_err(|e| ImportError::Workbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoWorksheet)?
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(CellValue::from).collect())
        .collect();
    sheet_rows(&rows, first_row)
}

/// A row that passed validation.
#[derive(Debug, Clone)]
pub struct ValidRow {
    pub row: usize,
    pub input: ProductInput,
    pub currency: CurrencyCode,
    pub category: Option<String>,
    pub brand: Option<String>,
}

/// Validation outcome of one row.
#[derive(Debug, Clone, Default)]
pub struct RowCheck {
    pub valid: Option<ValidRow>,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
}

/// Validate a row and build its product input.
#[must_use]
pub fn validate_row(row: &SheetRow, default_currency: CurrencyCode) -> RowCheck {
    let n = row.row;
    let mut check = RowCheck::default();

    let title = row.text("title");
    if title.is_none() {
        check.errors.push(RowIssue::new(n, Some("title"), "title is required"));
    }

    let price = row.get("price").decimal().map(round_money);
    match price {
        None => check.errors.push(RowIssue::new(n, Some("price"), "a valid price is required")),
        Some(p) if p < Decimal::ZERO => {
            check.errors.push(RowIssue::new(n, Some("price"), "price cannot be negative"));
        }
        Some(_) => {}
    }

    let compare_at_price = row.get("compare_at_price").decimal().map(round_money);
    if let Some(compare) = compare_at_price {
        if compare < Decimal::ZERO {
            check.errors.push(RowIssue::new(
                n,
                Some("compare_at_price"),
                "compare at price cannot be negative",
            ));
        } else if price.is_some_and(|p| compare <= p) {
            check.warnings.push(RowIssue::new(
                n,
                Some("compare_at_price"),
                "compare at price should be greater than price",
            ));
        }
    }

    let stock_quantity = match row.get("stock_quantity") {
        CellValue::Empty => 0,
        cell => match cell.decimal().filter(|d| d.fract().is_zero()).and_then(|d| d.to_i32()) {
            Some(q) if q >= 0 => q,
            Some(_) => {
                check.errors.push(RowIssue::new(
                    n,
                    Some("stock_quantity"),
                    "stock quantity cannot be negative",
                ));
                0
            }
            _ => {
                check.errors.push(RowIssue::new(
                    n,
                    Some("stock_quantity"),
                    "stock quantity must be a whole number",
                ));
                0
            }
        },
    };

    let sku = row.text("sku");
    if sku.as_ref().is_some_and(|s| s.chars().count() > MAX_SKU_LENGTH) {
        check.warnings.push(RowIssue::new(
            n,
            Some("sku"),
            format!("SKU is longer than {MAX_SKU_LENGTH} characters"),
        ));
    }
    let barcode = row.text("barcode");
    if barcode.as_ref().is_some_and(|b| b.chars().count() > MAX_BARCODE_LENGTH) {
        check.warnings.push(RowIssue::new(
            n,
            Some("barcode"),
            format!("barcode is longer than {MAX_BARCODE_LENGTH} characters"),
        ));
    }

    let currency = match row.text("currency") {
        Some(code) => code.parse::<CurrencyCode>().unwrap_or_else(|_| {
            check.warnings.push(RowIssue::new(
                n,
                Some("currency"),
                format!("unsupported currency {code}, using {default_currency}"),
            ));
            default_currency
        }),
        None => default_currency,
    };

    if !check.errors.is_empty() {
        return check;
    }
    let (Some(title), Some(price)) = (title, price) else {
        return check;
    };

    let images: Vec<ImageInput> = row
        .get("image_urls")
        .list()
        .into_iter()
        .enumerate()
        .map(|(i, url)| ImageInput {
            url,
            alt_text: Some(title.clone()),
            is_main: i == 0,
        })
        .collect();
    let attributes = row.get("attributes").list();

    let input = ProductInput {
        title,
        title_ar: row.text("title_ar"),
        description_en: row.text("description_en"),
        description_ar: row.text("description_ar"),
        price,
        compare_at_price,
        currency: Some(currency.code().to_owned()),
        sku,
        barcode,
        stock_quantity,
        is_active: row.get("is_active").boolean().unwrap_or(true),
        is_featured: row.get("is_featured").boolean().unwrap_or(false),
        is_new: row.get("is_new").boolean().unwrap_or(false),
        category_id: None,
        brand_id: None,
        active_ingredients: row.text("active_ingredients"),
        skin_types: row.get("skin_types").list(),
        concerns: row.get("concerns").list(),
        features: row.get("features").list(),
        features_ar: row.get("features_ar").list(),
        ingredients: row.text("ingredients"),
        ingredients_ar: row.text("ingredients_ar"),
        how_to_use: row.text("how_to_use"),
        how_to_use_ar: row.text("how_to_use_ar"),
        usage: row.text("usage"),
        meta_title: row.text("meta_title"),
        meta_description: row.text("meta_description"),
        attributes: (!attributes.is_empty()).then(|| serde_json::json!(attributes)),
        images: (!images.is_empty()).then_some(images),
    };

    check.valid = Some(ValidRow {
        row: n,
        input,
        currency,
        category: row.text("category"),
        brand: row.text("brand"),
    });
    check
}

/// Runs imports against the catalog.
pub struct ImportService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
}

impl<'a> ImportService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self { pool, cache }
    }

    /// Import products from an uploaded workbook.
    ///
    /// Each product is written in its own transaction; a failing row does
    /// not stop the others. Dry runs validate only.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the workbook cannot be read or has no data.
    #[instrument(skip(self, bytes, options), fields(file_name = %file_name, dry_run = options.dry_run))]
    pub async fn import(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        options: ImportOptions,
        imported_by: UserId,
        default_currency: CurrencyCode,
    ) -> Result<ImportReport, ImportError> {
        let rows = read_workbook(bytes)?;
        let mut report = ImportReport {
            total_rows: rows.len(),
            dry_run: options.dry_run,
            ..ImportReport::default()
        };

        let mut valid = Vec::new();
        for row in &rows {
            let check = validate_row(row, default_currency);
            if check.valid.is_none() {
                report.failure_count += 1;
            }
            report.errors.extend(check.errors);
            report.warnings.extend(check.warnings);
            valid.extend(check.valid);
        }

        if options.dry_run {
            report.success_count = valid.len();
            return Ok(report);
        }

        let logs = ImportLogRepository::new(self.pool);
        let log_id = logs
            .start(file_name, imported_by, i32::try_from(rows.len()).unwrap_or(i32::MAX))
            .await?;
        report.import_log_id = Some(log_id);

        let mut categories: HashMap<String, Option<CategoryId>> = HashMap::new();
        let mut brands: HashMap<String, Option<BrandId>> = HashMap::new();

        for mut row in valid {
            let outcome = async {
                if let Some(name) = &row.category {
                    row.input.category_id = self
                        .resolve_category(name, options.create_missing_categories, &mut categories, &mut report)
                        .await?;
                }
                if let Some(name) = &row.brand {
                    row.input.brand_id = self
                        .resolve_brand(name, options.create_missing_brands, &mut brands, &mut report)
                        .await?;
                }
                self.import_one(&row).await
            }
            .await;

            match outcome {
                Ok(true) => report.success_count += 1,
                Ok(false) => {
                    report.skipped += 1;
                    report.warnings.push(RowIssue::new(
                        row.row,
                        None,
                        "a product with this SKU or title already exists",
                    ));
                }
                Err(e) => {
                    warn!(row = row.row, error = %e, "Import row failed");
                    report.failure_count += 1;
                    report.errors.push(RowIssue::new(row.row, None, import_failure_message(&e)));
                }
            }
        }

        let status = if report.success_count == 0 && report.failure_count > 0 {
            "failed"
        } else {
            "completed"
        };
        logs.finish(
            log_id,
            status,
            to_i32(report.success_count),
            to_i32(report.failure_count),
            to_i32(report.skipped),
            &report.errors,
        )
        .await?;

        if report.success_count > 0 {
            self.cache.invalidate_products().await;
        }
        if report.categories_created > 0 {
            self.cache.invalidate_categories().await;
        }

        info!(
            import_log_id = %log_id,
            success = report.success_count,
            failed = report.failure_count,
            skipped = report.skipped,
            "Import finished"
        );
        Ok(report)
    }

    async fn import_one(&self, row: &ValidRow) -> Result<bool, RepositoryError> {
        let base = Slug::from_title(&row.input.title)
            .or_else(|| Slug::from_title(&format!("product {}", row.row)))
            .ok_or_else(|| RepositoryError::Conflict("title has no usable characters".to_owned()))?;
        let products = ProductRepository::new(self.pool);
        let slug = unique_slug(&base, |s| {
            let products = &products;
            async move { products.slug_exists(&s, None).await }
        })
        .await?;

        let imported = import_product(self.pool, &row.input, &slug, row.currency.code()).await?;
        if let Some(product) = &imported {
            debug!(row = row.row, product_id = %product.id, "Imported product");
        }
        Ok(imported.is_some())
    }

    async fn resolve_category(
        &self,
        name: &str,
        create: bool,
        seen: &mut HashMap<String, Option<CategoryId>>,
        report: &mut ImportReport,
    ) -> Result<Option<CategoryId>, RepositoryError> {
        let key = name.trim().to_lowercase();
        if let Some(id) = seen.get(&key) {
            return Ok(*id);
        }
        let repo = CategoryRepository::new(self.pool);
        let id = match repo.find_by_name(name).await? {
            Some(category) => Some(category.id),
            None if create => {
                let base = Slug::from_title(name)
                    .ok_or_else(|| RepositoryError::Conflict(format!("invalid category name {name}")))?;
                let slug = unique_slug(&base, |s| {
                    let repo = &repo;
                    async move { repo.slug_exists(&s, None).await }
                })
                .await?;
                let category = repo
                    .create(
                        &CategoryInput {
                            name: name.trim().to_owned(),
                            name_ar: None,
                            slug: None,
                            description: None,
                            image_url: None,
                            parent_id: None,
                            sort_order: 0,
                            is_active: true,
                        },
                        &slug,
                    )
                    .await?;
                report.categories_created += 1;
                Some(category.id)
            }
            None => None,
        };
        seen.insert(key, id);
        Ok(id)
    }

    async fn resolve_brand(
        &self,
        name: &str,
        create: bool,
        seen: &mut HashMap<String, Option<BrandId>>,
        report: &mut ImportReport,
    ) -> Result<Option<BrandId>, RepositoryError> {
        let key = name.trim().to_lowercase();
        if let Some(id) = seen.get(&key) {
            return Ok(*id);
        }
        let repo = BrandRepository::new(self.pool);
        let id = match repo.find_by_name(name).await? {
            Some(brand) => Some(brand.id),
            None if create => {
                let base = Slug::from_title(name)
                    .ok_or_else(|| RepositoryError::Conflict(format!("invalid brand name {name}")))?;
                let slug = unique_slug(&base, |s| {
                    let repo = &repo;
                    async move { repo.slug_exists(&s, None).await }
                })
                .await?;
                let brand = repo
                    .create(
                        &BrandInput {
                            name: name.trim().to_owned(),
                            name_ar: None,
                            slug: None,
                            description: None,
                            logo_url: None,
                            website_url: None,
                            is_active: true,
                        },
                        &slug,
                    )
                    .await?;
                report.brands_created += 1;
                Some(brand.id)
            }
            None => None,
        };
        seen.insert(key, id);
        Ok(id)
    }

    /// Most recent import runs.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Repository` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<crate::models::import::ImportLog>, ImportError> {
        Ok(ImportLogRepository::new(self.pool).recent(limit).await?)
    }
}

fn import_failure_message(e: &RepositoryError) -> String {
    match e {
        RepositoryError::Conflict(message) => message.clone(),
        _ => "could not save product".to_owned(),
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_owned())
    }

    fn sheet(rows: Vec<Vec<CellValue>>) -> Vec<SheetRow> {
        sheet_rows(&rows, 0).unwrap()
    }

    #[test]
    fn test_normalize_header_aliases() {
        assert_eq!(normalize_header("Title*"), "title");
        assert_eq!(normalize_header("Title (Arabic)"), "title_ar");
        assert_eq!(normalize_header("title_ar"), "title_ar");
        assert_eq!(normalize_header(" Stock "), "stock_quantity");
        assert_eq!(normalize_header("Compare-At Price"), "compare_at_price");
        assert_eq!(normalize_header("Images"), "image_urls");
        assert_eq!(normalize_header("How To Use (Arabic)"), "how_to_use_ar");
        assert_eq!(normalize_header("Shelf Life"), "shelflife");
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "1", "YES", "y", "On"] {
            assert_eq!(parse_bool(yes), Some(true), "{yes}");
        }
        for no in ["false", "0", "No", "n", "OFF"] {
            assert_eq!(parse_bool(no), Some(false), "{no}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_cell_text_formats_whole_numbers() {
        assert_eq!(CellValue::Number(12345.0).text().as_deref(), Some("12345"));
        assert_eq!(CellValue::Number(2.5).text().as_deref(), Some("2.5"));
        assert_eq!(text("  ").text(), None);
        assert_eq!(CellValue::Number(19.99).decimal(), Some(Decimal::from_str("19.99").unwrap()));
    }

    #[test]
    fn test_sheet_rows_numbering_and_empty_rows() {
        let rows = sheet(vec![
            vec![text("Title"), text("Price")],
            vec![text("Serum"), CellValue::Number(10.0)],
            vec![CellValue::Empty, CellValue::Empty],
            vec![text("Toner"), CellValue::Number(8.0)],
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[1].row, 4);
        assert_eq!(rows[1].text("title").as_deref(), Some("Toner"));
    }

    #[test]
    fn test_sheet_rows_offset_header() {
        let rows = sheet_rows(
            &[
                vec![text("Title"), text("Price")],
                vec![text("Serum"), CellValue::Number(10.0)],
            ],
            3,
        )
        .unwrap();
        assert_eq!(rows[0].row, 5);
    }

    #[test]
    fn test_sheet_rows_requires_data() {
        assert!(matches!(sheet_rows(&[], 0), Err(ImportError::TooFewRows)));
        assert!(matches!(
            sheet_rows(&[vec![text("Title")], vec![CellValue::Empty]], 0),
            Err(ImportError::TooFewRows)
        ));
    }

    #[test]
    fn test_validate_full_row() {
        let rows = sheet(vec![
            vec![
                text("Title*"),
                text("Price*"),
                text("Stock"),
                text("Featured"),
                text("Skin Type"),
                text("Images"),
                text("Category"),
            ],
            vec![
                text("Vitamin C Serum"),
                CellValue::Number(24.5),
                CellValue::Number(12.0),
                text("yes"),
                text("oily, combination ,"),
                text("https://cdn/a.jpg, https://cdn/b.jpg"),
                text("Serums"),
            ],
        ]);
        let check = validate_row(&rows[0], CurrencyCode::JOD);
        assert!(check.errors.is_empty());
        let valid = check.valid.unwrap();

        assert_eq!(valid.input.title, "Vitamin C Serum");
        assert_eq!(valid.input.price, Decimal::from_str("24.5").unwrap());
        assert_eq!(valid.input.stock_quantity, 12);
        assert!(valid.input.is_active);
        assert!(valid.input.is_featured);
        assert_eq!(valid.input.skin_types, ["oily", "combination"]);
        let images = valid.input.images.unwrap();
        assert!(images[0].is_main);
        assert!(!images[1].is_main);
        assert_eq!(valid.category.as_deref(), Some("Serums"));
        assert_eq!(valid.currency, CurrencyCode::JOD);
    }

    #[test]
    fn test_validate_errors() {
        let rows = sheet(vec![
            vec![text("Title"), text("Price"), text("Stock")],
            vec![CellValue::Empty, text("abc"), CellValue::Number(-1.0)],
        ]);
        let check = validate_row(&rows[0], CurrencyCode::JOD);
        assert!(check.valid.is_none());
        let fields: Vec<_> = check.errors.iter().filter_map(|e| e.field.as_deref()).collect();
        assert_eq!(fields, ["title", "price", "stock_quantity"]);
        assert!(check.errors.iter().all(|e| e.row == 2));
    }

    #[test]
    fn test_validate_warnings() {
        let rows = sheet(vec![
            vec![text("Title"), text("Price"), text("Compare At Price"), text("Currency"), text("SKU")],
            vec![
                text("Cleanser"),
                CellValue::Number(10.0),
                CellValue::Number(9.0),
                text("GBP"),
                text(&"X".repeat(101)),
            ],
        ]);
        let check = validate_row(&rows[0], CurrencyCode::USD);
        assert!(check.errors.is_empty());
        assert_eq!(check.warnings.len(), 3);
        assert_eq!(check.valid.unwrap().currency, CurrencyCode::USD);
    }
}
