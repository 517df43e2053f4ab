//! Conversion from upstream record shapes to store write models.

use rust_decimal::Decimal;
use xeno_core::CustomerId;

use crate::db::{CustomerRecord, OrderRecord, ProductRecord};
use crate::shopify::{ShopifyCustomer, ShopifyOrder, ShopifyProduct};

impl From<ShopifyCustomer> for CustomerRecord {
    fn from(customer: ShopifyCustomer) -> Self {
        Self {
            shopify_id: customer.id,
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
            total_spent: customer.total_spent.unwrap_or(Decimal::ZERO),
            orders_count: customer.orders_count.unwrap_or(0),
        }
    }
}

impl From<ShopifyProduct> for ProductRecord {
    fn from(product: ShopifyProduct) -> Self {
        // Listing price is the first variant's
        let price = product
            .variants
            .first()
            .and_then(|variant| variant.price)
            .unwrap_or(Decimal::ZERO);

        Self {
            shopify_id: product.id,
            title: product.title,
            price,
        }
    }
}

/// Build the order write model once the customer link has been resolved.
pub(crate) fn order_record(order: ShopifyOrder, customer_id: Option<CustomerId>) -> OrderRecord {
    OrderRecord {
        shopify_id: order.id,
        total_price: order.total_price.unwrap_or(Decimal::ZERO),
        currency: order.currency,
        financial_status: order.financial_status,
        processed_at: order.processed_at,
        customer_id,
    }
}
