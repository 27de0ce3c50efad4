//! Menu product catalog.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::context::SessionContext;
use crate::error::CajaError;
use crate::fields::FieldMap;
use crate::sessions::parse_amount;

const PATH_PRODUCTS: &str = "/api/Productos";

const PRODUCT_FIELDS: FieldMap = FieldMap::new(&[
    ("id", &["id", "Id"]),
    ("name", &["nombre", "Nombre"]),
    ("description", &["descripcion", "Descripcion"]),
    ("kind", &["tipo", "Tipo"]),
    ("price", &["precio", "Precio"]),
    ("storable", &["almacenable", "Almacenable"]),
    ("imageUrl", &["imagenUrl", "ImagenUrl"]),
]);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub price: f64,
    pub storable: bool,
    pub image_url: Option<String>,
}

impl Product {
    pub fn from_value(v: &Value) -> Option<Self> {
        Some(Self {
            id: PRODUCT_FIELDS.text(v, "id")?,
            name: PRODUCT_FIELDS.text(v, "name").unwrap_or_default(),
            description: PRODUCT_FIELDS.text(v, "description"),
            kind: PRODUCT_FIELDS.text(v, "kind"),
            price: PRODUCT_FIELDS.amount(v, "price"),
            storable: PRODUCT_FIELDS.boolean(v, "storable").unwrap_or(false),
            image_url: PRODUCT_FIELDS.text(v, "imageUrl"),
        })
    }
}

/// Operator input for a new product.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub kind: String,
    pub price: String,
    pub storable: bool,
    pub image_url: Option<String>,
}

impl NewProduct {
    /// Validate and build the request body (the backend expects the
    /// capitalized keys).
    fn to_body(&self) -> Result<Value, CajaError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CajaError::validation("Enter the product name."));
        }
        let price = parse_amount(&self.price, "price")?;
        let image_url = self
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        Ok(json!({
            "Nombre": name,
            "Descripcion": self.description.trim(),
            "Tipo": self.kind.trim(),
            "Precio": price,
            "Almacenable": self.storable,
            "ImagenUrl": image_url,
        }))
    }
}

pub async fn list_products(
    api: &ApiClient,
    ctx: &SessionContext,
) -> Result<Vec<Product>, CajaError> {
    let body = api
        .get(PATH_PRODUCTS, ctx)
        .await
        .into_read_result("Failed to load products")?;
    let products = body
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let product = Product::from_value(item);
                    if product.is_none() {
                        warn!("skipping product without id");
                    }
                    product
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(products)
}

pub async fn register_product(
    api: &ApiClient,
    ctx: &SessionContext,
    product: &NewProduct,
) -> Result<Value, CajaError> {
    let body = product.to_body()?;
    let created = api
        .post(PATH_PRODUCTS, ctx, body)
        .await
        .into_write_result("Failed to register product")?;
    info!(name = %product.name.trim(), "product registered");
    Ok(created)
}

pub async fn delete_product(
    api: &ApiClient,
    ctx: &SessionContext,
    product_id: &str,
) -> Result<(), CajaError> {
    let product_id = product_id.trim();
    if product_id.is_empty() {
        return Err(CajaError::validation("Missing product id."));
    }
    api.delete(&format!("{PATH_PRODUCTS}/{product_id}"), ctx)
        .await
        .into_write_result("Failed to delete product")?;
    info!(product_id, "product deleted");
    Ok(())
}
