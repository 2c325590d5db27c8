use gymfuel_core::{Cart, CartItemId, CartMutation, ProductId, ProductVariantId, VariantKey};
use serde_json::Value;
use tracing::{debug, instrument};

use super::CartBackend;
use crate::api::{
    AddToCartRequest, CommerceClient, Envelope, RemoteCart, UpdateCartItemRequest,
};
use crate::error::StoreError;

/// Cart held server-side by the commerce API.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: CommerceClient,
}

impl RemoteBackend {
    #[must_use]
    pub const fn new(client: CommerceClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub const fn client(&self) -> &CommerceClient {
        &self.client
    }

    /// Server line ID for a local line, asking the server when the local copy
    /// has not been reconciled yet.
    async fn line_id(
        &self,
        before: &Cart,
        product_id: &ProductId,
        variant: &VariantKey,
    ) -> Result<CartItemId, StoreError> {
        if let Some(id) = before
            .find(product_id, variant)
            .and_then(|line| line.line_id.clone())
        {
            return Ok(id);
        }

        debug!(product_id = %product_id, variant = %variant, "Line ID unknown locally, fetching server cart");
        self.fetch_latest()
            .await?
            .find(product_id, variant)
            .and_then(|line| line.line_id.clone())
            .ok_or_else(|| StoreError::LineNotFound {
                product_id: product_id.clone(),
                variant: variant.clone(),
            })
    }
}

impl CartBackend for RemoteBackend {
    fn reconciles(&self) -> bool {
        true
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Cart, StoreError> {
        let envelope: Envelope<RemoteCart> = self.client.get("/cart").await?;
        Ok(envelope.data.unwrap_or_default().into_cart())
    }

    #[instrument(skip(self))]
    async fn fetch_latest(&self) -> Result<Cart, StoreError> {
        let envelope: Envelope<RemoteCart> = self.client.get_fresh("/cart").await?;
        Ok(envelope.data.unwrap_or_default().into_cart())
    }

    #[instrument(skip(self, before))]
    async fn submit(&self, before: &Cart, mutation: &CartMutation) -> Result<(), StoreError> {
        match mutation {
            CartMutation::Add(line) => {
                let variant_id: ProductVariantId = line
                    .variant_id
                    .clone()
                    .or_else(|| {
                        before
                            .find(&line.product_id, &line.variant_key())
                            .and_then(|existing| existing.variant_id.clone())
                    })
                    .ok_or_else(|| StoreError::MissingVariant(line.product_id.clone()))?;

                let _: Envelope<Value> = self
                    .client
                    .post(
                        "/cart/add",
                        &AddToCartRequest {
                            product_variant_id: &variant_id,
                            quantity: line.quantity,
                        },
                    )
                    .await?;
            }
            CartMutation::SetQuantity {
                product_id,
                variant,
                quantity,
            } => {
                let id = self.line_id(before, product_id, variant).await?;
                let _: Envelope<Value> = self
                    .client
                    .patch(
                        &format!("/cart/update/{id}"),
                        &UpdateCartItemRequest {
                            quantity: *quantity,
                        },
                    )
                    .await?;
            }
            CartMutation::Remove {
                product_id,
                variant,
            } => {
                let id = self.line_id(before, product_id, variant).await?;
                let _: Envelope<Value> = self.client.delete(&format!("/cart/remove/{id}")).await?;
            }
            CartMutation::Clear => {
                let _: Envelope<Value> = self.client.delete("/cart/clear").await?;
            }
        }
        Ok(())
    }

    fn persist(&self, _cart: &Cart) {}
}
