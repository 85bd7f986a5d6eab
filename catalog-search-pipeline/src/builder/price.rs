use std::collections::BTreeMap;

use super::{add_is, BuildContext, DocumentBuilder};
use crate::errors::BuildError;
use catalog_search_shared::fields;
use catalog_search_shared::{CatalogProduct, DocumentField, IndexDocument};

/// Writes evaluated prices from the build context.
///
/// Each price lands in `price_{currency}_{pricelist}`. The lowest price per
/// currency and overall are kept in `price_{currency}` and `price`.
#[derive(Debug, Default)]
pub struct PriceDocumentBuilder;

impl DocumentBuilder<CatalogProduct> for PriceDocumentBuilder {
    fn update_document(
        &self,
        document: &mut IndexDocument,
        product: &CatalogProduct,
        context: &BuildContext,
    ) -> Result<bool, BuildError> {
        let prices = context.prices_for(&product.id);

        let mut by_currency: BTreeMap<String, f64> = BTreeMap::new();
        let mut lowest: Option<f64> = None;

        for price in prices {
            let value = price.effective_value();
            if !value.is_finite() {
                return Err(BuildError::invalid(
                    &product.id,
                    format!("price {} has no finite value", price.id),
                ));
            }

            document.set(DocumentField::keyword(
                fields::pricelist_price_field(&price.currency, &price.pricelist_id),
                value,
            ));

            let entry = by_currency
                .entry(fields::currency_price_field(&price.currency))
                .or_insert(value);
            *entry = entry.min(value);
            lowest = Some(lowest.map_or(value, |l| l.min(value)));
        }

        for (field, value) in by_currency {
            document.set(DocumentField::keyword(field, value));
        }
        if let Some(value) = lowest {
            document.set(DocumentField::keyword(fields::PRICE_FIELD, value));
        }

        add_is(document, if prices.is_empty() { "unpriced" } else { "priced" });
        Ok(true)
    }
}
