//! Typed backend operations.
//!
//! The store and the extraction workflow are generic over [`CardsApi`];
//! [`ApiClient`] is the production implementation.

use reqwest::Method;
use serde_json::Value;

use crate::domain::{
    AppError, CardList, Contact, ContactId, ContactPatch, ContactPayload, ExtractionDraft,
    ImageUpload, PingResponse, Result, VcardRequest,
};
use crate::infrastructure::{ApiClient, RequestBody, RequestOptions};

/// Backend contract consumed by the client.
#[allow(async_fn_in_trait)]
pub trait CardsApi {
    /// `GET /all_cards`
    async fn all_cards(&self) -> Result<Vec<Contact>>;

    /// `POST /extract` with a multipart image upload.
    async fn extract(&self, upload: &ImageUpload, api_key: Option<&str>)
        -> Result<ExtractionDraft>;

    /// `POST /create_card`; the created record is ignored.
    async fn create_card(&self, payload: &ContactPayload) -> Result<()>;

    /// `PATCH /update_card/{id}`; the updated record is ignored.
    async fn update_card(&self, id: &ContactId, patch: &ContactPatch) -> Result<()>;

    /// `DELETE /delete_card/{id}`
    async fn delete_card(&self, id: &ContactId) -> Result<()>;

    /// `POST /vcard`, returning the vCard file bytes.
    async fn vcard(&self, request: &VcardRequest) -> Result<Vec<u8>>;

    /// `GET /ping`
    async fn ping(&self) -> Result<PingResponse>;
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(AppError::json_parse)
}

impl CardsApi for ApiClient {
    async fn all_cards(&self) -> Result<Vec<Contact>> {
        let list: CardList = self
            .request("/all_cards", RequestOptions::default())
            .await?
            .into_json()?;
        list.into_contacts()
    }

    async fn extract(
        &self,
        upload: &ImageUpload,
        api_key: Option<&str>,
    ) -> Result<ExtractionDraft> {
        let mut options = RequestOptions {
            method: Method::POST,
            headers: Vec::new(),
            body: RequestBody::Multipart(upload.clone()),
        };
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            options = options.with_header("Authorization", format!("Bearer {key}"));
        }
        self.request("/extract", options).await?.into_json()
    }

    async fn create_card(&self, payload: &ContactPayload) -> Result<()> {
        self.request(
            "/create_card",
            RequestOptions::json(Method::POST, to_json(payload)?),
        )
        .await?;
        Ok(())
    }

    async fn update_card(&self, id: &ContactId, patch: &ContactPatch) -> Result<()> {
        self.request(
            &format!("/update_card/{id}"),
            RequestOptions::json(Method::PATCH, to_json(patch)?),
        )
        .await?;
        Ok(())
    }

    async fn delete_card(&self, id: &ContactId) -> Result<()> {
        self.request(
            &format!("/delete_card/{id}"),
            RequestOptions::method(Method::DELETE),
        )
        .await?;
        Ok(())
    }

    async fn vcard(&self, request: &VcardRequest) -> Result<Vec<u8>> {
        self.request_bytes(
            "/vcard",
            RequestOptions::json(Method::POST, to_json(request)?),
        )
        .await
    }

    async fn ping(&self) -> Result<PingResponse> {
        self.request("/ping", RequestOptions::default())
            .await?
            .into_json()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory backend used by the application tests.

    use std::cell::{Cell, RefCell};

    use super::CardsApi;
    use crate::domain::{
        AppError, Contact, ContactId, ContactPatch, ContactPayload, ExtractionDraft, ImageUpload,
        PingResponse, Result, VcardRequest,
    };

    #[derive(Default)]
    pub struct FakeApi {
        pub cards: RefCell<Vec<Contact>>,
        pub calls: RefCell<Vec<String>>,
        pub draft: RefCell<Option<ExtractionDraft>>,
        /// Status returned by every mutating call while set.
        pub fail_with: Cell<Option<u16>>,
        pub fail_list: Cell<bool>,
        next_id: Cell<u32>,
    }

    impl FakeApi {
        pub fn with_cards(cards: Vec<Contact>) -> Self {
            let api = Self::default();
            api.next_id.set(u32::try_from(cards.len()).unwrap_or(0) + 100);
            *api.cards.borrow_mut() = cards;
            api
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn log(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }

        fn check(&self) -> Result<()> {
            match self.fail_with.get() {
                Some(status) => Err(AppError::Http {
                    status,
                    status_text: "Internal Server Error".into(),
                    detail: "boom".into(),
                }),
                None => Ok(()),
            }
        }
    }

    pub fn card(id: &str, name: &str) -> Contact {
        Contact {
            id: ContactId::new(id),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    impl CardsApi for FakeApi {
        async fn all_cards(&self) -> Result<Vec<Contact>> {
            self.log("all_cards");
            if self.fail_list.get() {
                return Err(AppError::Http {
                    status: 503,
                    status_text: "Service Unavailable".into(),
                    detail: "down".into(),
                });
            }
            Ok(self.cards.borrow().clone())
        }

        async fn extract(
            &self,
            upload: &ImageUpload,
            _api_key: Option<&str>,
        ) -> Result<ExtractionDraft> {
            self.log(format!("extract {}", upload.file_name));
            self.check()?;
            Ok(self.draft.borrow().clone().unwrap_or_default())
        }

        async fn create_card(&self, payload: &ContactPayload) -> Result<()> {
            self.log("create_card");
            self.check()?;
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            let mut contact = Contact::from_payload(ContactId::new(id.to_string()), payload);
            contact.created_at = Some("2026-01-01T00:00:00Z".into());
            self.cards.borrow_mut().insert(0, contact);
            Ok(())
        }

        async fn update_card(&self, id: &ContactId, patch: &ContactPatch) -> Result<()> {
            self.log(format!("update_card {id}"));
            self.check()?;
            let mut cards = self.cards.borrow_mut();
            let card = cards
                .iter_mut()
                .find(|c| &c.id == id)
                .ok_or_else(|| AppError::Http {
                    status: 404,
                    status_text: "Not Found".into(),
                    detail: "Card not found".into(),
                })?;
            if let Some(name) = &patch.name {
                card.name = Some(name.clone());
            }
            card.edited_at = Some("2026-01-02T00:00:00Z".into());
            Ok(())
        }

        async fn delete_card(&self, id: &ContactId) -> Result<()> {
            self.log(format!("delete_card {id}"));
            self.check()?;
            self.cards.borrow_mut().retain(|c| &c.id != id);
            Ok(())
        }

        async fn vcard(&self, request: &VcardRequest) -> Result<Vec<u8>> {
            self.log("vcard");
            self.check()?;
            Ok(format!("FN:{}", request.name.clone().unwrap_or_default()).into_bytes())
        }

        async fn ping(&self) -> Result<PingResponse> {
            self.log("ping");
            Ok(PingResponse {
                time: Some("now".into()),
            })
        }
    }
}
