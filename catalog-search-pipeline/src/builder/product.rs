use chrono::{DateTime, NaiveDate, Utc};

use super::{add_is, BuildContext, CommonFields, DocumentBuilder};
use crate::errors::BuildError;
use catalog_search_shared::fields;
use catalog_search_shared::{CatalogProduct, DocumentField, IndexDocument};

/// Status of a product: only active products that are not variations are
/// visible. A product without an active flag is hidden.
pub fn product_visibility(product: &CatalogProduct) -> &'static str {
    if product.is_active != Some(true) || product.main_product_id.is_some() {
        fields::STATUS_HIDDEN
    } else {
        fields::STATUS_VISIBLE
    }
}

/// End date indexed for products that never expire.
pub fn open_end_date() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Writes the core fields of a product document.
#[derive(Debug, Default)]
pub struct ProductDocumentBuilder;

impl DocumentBuilder<CatalogProduct> for ProductDocumentBuilder {
    fn update_document(
        &self,
        document: &mut IndexDocument,
        product: &CatalogProduct,
        _context: &BuildContext,
    ) -> Result<bool, BuildError> {
        if product.id.is_empty() {
            return Err(BuildError::invalid(&product.code, "product has no id"));
        }

        let status = product_visibility(product);
        let is_digital = product
            .product_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("digital"));

        CommonFields {
            id: &product.id,
            code: &product.code,
            name: &product.name,
            created_date: product.created_date,
            modified_date: product.modified_date,
            priority: product.priority,
        }
        .write(document);

        document.add(DocumentField::keyword(
            fields::TYPE_FIELD,
            product.product_type.clone().unwrap_or_default(),
        ));
        document.add(DocumentField::keyword(fields::STATUS_FIELD, status));
        add_is(document, status);
        add_is(document, "product");
        add_is(document, &product.code);
        add_is(document, if is_digital { "digital" } else { "physical" });

        document.add(DocumentField::keyword(fields::START_DATE_FIELD, product.start_date));
        document.add(DocumentField::keyword(
            fields::END_DATE_FIELD,
            product.end_date.unwrap_or_else(open_end_date),
        ));
        if let Some(vendor) = &product.vendor {
            document.add(DocumentField::keyword(fields::VENDOR_FIELD, vendor.as_str()));
        }

        if let Some(category_id) = &product.category_id {
            document.set(DocumentField::keyword(
                fields::priority_field(&product.catalog_id, category_id),
                product.priority,
            ));
        }
        for link in &product.links {
            if let Some(category_id) = &link.category_id {
                document.set(DocumentField::keyword(
                    fields::priority_field(&link.catalog_id, category_id),
                    link.priority,
                ));
            }
        }

        Ok(true)
    }
}
