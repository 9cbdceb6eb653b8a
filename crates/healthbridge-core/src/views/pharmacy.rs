//! Pharmacy: catalog browsing, cart, script upload and checkout.
//!
//! `Browsing -> ItemsInCart -> Checkout -> (Blocked | OrderPlaced)`. An order with a
//! prescription item is blocked until a script has been uploaded this session; a
//! blocked order leaves the cart exactly as it was.

use crate::catalog;
use crate::error::ValidationError;
use crate::model::{PharmacyProduct, ProductCategory};
use crate::state::SharedAppState;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

pub const ORDER_SUCCESS_MESSAGE: &str = "Order Successful! Sizwe will deliver your package in 24 hours.";
pub const SCRIPT_UPLOADED_MESSAGE: &str =
    "Prescription script uploaded successfully! You can now proceed with your order.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(ProductCategory),
}

impl CategoryFilter {
    pub fn matches(&self, product: &PharmacyProduct) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => product.category == *c,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All"),
            CategoryFilter::Only(c) => f.write_str(c.label()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartPhase {
    Browsing,
    ItemsInCart,
    Checkout,
    /// Last order attempt needed a script that has not been uploaded.
    Blocked,
    OrderPlaced,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub total: f64,
    pub item_count: usize,
    pub message: String,
}

pub struct Pharmacy {
    state: SharedAppState,
    catalog: Vec<PharmacyProduct>,
    filter: CategoryFilter,
    cart: Vec<PharmacyProduct>,
    phase: CartPhase,
}

impl Pharmacy {
    pub fn new(state: SharedAppState) -> Self {
        Self::with_catalog(state, catalog::pharmacy_items())
    }

    pub fn with_catalog(state: SharedAppState, catalog: Vec<PharmacyProduct>) -> Self {
        Self {
            state,
            catalog,
            filter: CategoryFilter::All,
            cart: Vec::new(),
            phase: CartPhase::Browsing,
        }
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    /// Catalog entries passing the current filter, in catalog order.
    pub fn visible(&self) -> Vec<&PharmacyProduct> {
        self.catalog.iter().filter(|p| self.filter.matches(p)).collect()
    }

    /// Duplicates are separate cart lines.
    pub fn add_to_cart(&mut self, product_id: &str) -> Result<&PharmacyProduct, ValidationError> {
        let product = self
            .catalog
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownProduct(product_id.to_string()))?;
        self.cart.push(product);
        if matches!(self.phase, CartPhase::Browsing | CartPhase::OrderPlaced) {
            self.phase = CartPhase::ItemsInCart;
        }
        Ok(&self.cart[self.cart.len() - 1])
    }

    pub fn cart(&self) -> &[PharmacyProduct] {
        &self.cart
    }

    pub fn cart_total(&self) -> f64 {
        self.cart.iter().map(|p| p.price).sum()
    }

    pub fn has_prescription_item(&self) -> bool {
        self.cart.iter().any(|p| p.category == ProductCategory::Prescription)
    }

    pub fn phase(&self) -> CartPhase {
        self.phase
    }

    pub fn open_checkout(&mut self) -> Result<(), ValidationError> {
        if self.cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        self.phase = CartPhase::Checkout;
        Ok(())
    }

    /// Back to the cart without ordering.
    pub fn close_checkout(&mut self) {
        if matches!(self.phase, CartPhase::Checkout | CartPhase::Blocked) {
            self.phase = CartPhase::ItemsInCart;
        }
    }

    /// Accepts any `image/*` MIME type or a `.pdf` file name. The file content is
    /// never read; only the fact of the upload is recorded.
    pub async fn upload_script(&self, file_name: &str, mime: Option<&str>) -> Result<(), ValidationError> {
        if !is_script_format(file_name, mime) {
            let got = mime.unwrap_or(file_name).to_string();
            warn!(format = %got, "script upload refused");
            return Err(ValidationError::UnsupportedScriptFormat(got));
        }
        self.state.write().await.mark_script_uploaded();
        info!("prescription script uploaded");
        Ok(())
    }

    /// Reads the session's upload flag, then [`place_order`](Self::place_order).
    pub async fn submit_order(&mut self) -> Result<OrderConfirmation, ValidationError> {
        let script_uploaded = self.state.read().await.script_uploaded();
        self.place_order(script_uploaded)
    }

    pub fn place_order(&mut self, script_uploaded: bool) -> Result<OrderConfirmation, ValidationError> {
        if !matches!(self.phase, CartPhase::Checkout | CartPhase::Blocked) {
            return Err(ValidationError::CheckoutNotOpen);
        }
        if self.cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        if self.has_prescription_item() && !script_uploaded {
            self.phase = CartPhase::Blocked;
            info!(items = self.cart.len(), "order blocked pending prescription script");
            return Err(ValidationError::PrescriptionRequired);
        }
        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4(),
            total: self.cart_total(),
            item_count: self.cart.len(),
            message: ORDER_SUCCESS_MESSAGE.to_string(),
        };
        self.cart.clear();
        self.phase = CartPhase::OrderPlaced;
        info!(
            order_id = %confirmation.order_id,
            items = confirmation.item_count,
            total = confirmation.total,
            "order placed"
        );
        Ok(confirmation)
    }
}

fn is_script_format(file_name: &str, mime: Option<&str>) -> bool {
    let image = mime
        .map(|m| m.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);
    let pdf = Path::new(file_name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    image || pdf
}
