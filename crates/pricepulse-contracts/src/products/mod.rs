mod input;
mod record;

pub use input::{split_data_uri, ImagePayload, InputKind, ProductInput};
pub use record::{Coupon, DealStatus, Identity, PricePoint, Product, Valuation};
