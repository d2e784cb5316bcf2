//! Explicitly scoped client state: API client, session and site store.
//!
//! A `ClientContext` is created once per client session and handed to the
//! presentation layer. Every intent issues its API call and then applies the
//! result to the store, which rebuilds its derived view. Responses are applied
//! in the order they resolve.

use reqwest::StatusCode;
use tracing::{debug, warn};

use super::api_client::{ApiClient, ClientError, ImageFile};
use super::debounce::{Debouncer, SEARCH_DEBOUNCE};
use super::session::Session;
use super::store::SiteStore;
use crate::api::{DescriptionRequest, ImageUploadResponse};
use crate::db::{CreateSiteRequest, SessionUser, SignupRequest, SignupResponse, Site, UpdateSiteRequest};

pub struct ClientContext {
    api: ApiClient,
    session: Session,
    sites: SiteStore,
    search: Debouncer<String>,
}

impl ClientContext {
    pub fn new(api: ApiClient) -> Self {
        let session = match api.token() {
            Some(token) => Session::from_token(token.to_string()),
            None => Session::default(),
        };

        Self {
            api,
            session,
            sites: SiteStore::new(),
            search: Debouncer::new(SEARCH_DEBOUNCE),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sites(&self) -> &SiteStore {
        &self.sites
    }

    pub async fn signup(&mut self, request: &SignupRequest) -> Result<SignupResponse, ClientError> {
        self.api.signup(request).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&SessionUser, ClientError> {
        let response = self.api.login(email, password).await?;
        debug!(user_id = response.user.id, role = %response.user.role, "Logged in");

        self.api.set_token(Some(response.token.clone()));
        self.session = Session::new(response.token, response.user);
        self.session
            .user()
            .ok_or_else(|| ClientError::Decode("missing user".to_string()))
    }

    /// Resolve the user behind a stored token. An invalid token logs out.
    pub async fn restore(&mut self, token: String) -> Result<&SessionUser, ClientError> {
        self.api.set_token(Some(token.clone()));
        self.session = Session::from_token(token);

        match self.api.me().await {
            Ok(user) => {
                self.session.set_user(user);
                self.session
                    .user()
                    .ok_or_else(|| ClientError::Decode("missing user".to_string()))
            }
            Err(e) => {
                self.logout();
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) {
        self.api.set_token(None);
        self.session.logout();
    }

    pub async fn fetch_sites(&mut self) -> Result<(), ClientError> {
        self.sites.begin_request();
        match self.api.list_sites().await {
            Ok(sites) => {
                self.sites.set_sites(sites);
                self.sites.finish_request();
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to fetch sites")),
        }
    }

    /// Record a keystroke. The term reaches the store once typing pauses.
    pub fn type_search(&mut self, term: impl Into<String>) {
        self.search.push(term.into());
    }

    /// Wait for the pending search term to settle and apply it.
    pub async fn settle_search(&mut self) {
        if let Some(term) = self.search.next().await {
            self.sites.set_search_term(term);
        }
    }

    /// Apply the search term immediately, dropping any pending keystroke.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search.cancel();
        self.sites.set_search_term(term);
    }

    pub fn set_category_filter(&mut self, category: Option<String>) {
        self.sites.set_category_filter(category);
    }

    pub fn clear_filters(&mut self) {
        self.search.cancel();
        self.sites.clear_filters();
    }

    pub async fn create_site(&mut self, request: &CreateSiteRequest) -> Result<Site, ClientError> {
        self.sites.begin_request();
        match self.api.create_site(request).await {
            Ok(site) => {
                self.sites.apply_created(site.clone());
                self.sites.finish_request();
                Ok(site)
            }
            Err(e) => Err(self.fail(e, "Failed to create site")),
        }
    }

    pub async fn update_site(
        &mut self,
        id: i64,
        request: &UpdateSiteRequest,
    ) -> Result<Site, ClientError> {
        self.sites.begin_request();
        match self.api.update_site(id, request).await {
            Ok(site) => {
                self.sites.apply_updated(site.clone());
                self.sites.finish_request();
                Ok(site)
            }
            Err(e) => Err(self.fail(e, "Failed to update site")),
        }
    }

    pub async fn delete_site(&mut self, id: i64) -> Result<(), ClientError> {
        self.sites.begin_request();
        match self.api.delete_site(id).await {
            Ok(_) => {
                self.sites.apply_removed(id);
                self.sites.finish_request();
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to delete site")),
        }
    }

    /// Upload an image on its own, e.g. to preview it before saving a site
    pub async fn upload_image(&mut self, image: ImageFile) -> Result<ImageUploadResponse, ClientError> {
        let result = self.api.upload_image(image).await;
        result.map_err(|e| self.drop_rejected_token(e))
    }

    pub async fn create_site_with_image(
        &mut self,
        request: &CreateSiteRequest,
        image: Option<ImageFile>,
    ) -> Result<Site, ClientError> {
        self.sites.begin_request();
        match self.api.create_site_with_image(request, image).await {
            Ok(site) => {
                self.sites.apply_created(site.clone());
                self.sites.finish_request();
                Ok(site)
            }
            Err(e) => Err(self.fail(e, "Failed to create site")),
        }
    }

    pub async fn update_site_with_image(
        &mut self,
        id: i64,
        request: &UpdateSiteRequest,
        image: Option<ImageFile>,
    ) -> Result<Site, ClientError> {
        self.sites.begin_request();
        match self.api.update_site_with_image(id, request, image).await {
            Ok(site) => {
                self.sites.apply_updated(site.clone());
                self.sites.finish_request();
                Ok(site)
            }
            Err(e) => Err(self.fail(e, "Failed to update site")),
        }
    }

    pub async fn generate_description(
        &mut self,
        title: &str,
        category: &str,
        link: &str,
    ) -> Result<String, ClientError> {
        let request = DescriptionRequest {
            title: title.to_string(),
            category: category.to_string(),
            link: link.to_string(),
        };
        let result = self.api.generate_description(&request).await;
        result
            .map(|response| response.description)
            .map_err(|e| self.drop_rejected_token(e))
    }

    fn fail(&mut self, error: ClientError, fallback: &str) -> ClientError {
        let message = match &error {
            ClientError::Api { message, .. } => message.clone(),
            _ => fallback.to_string(),
        };
        self.sites.fail_request(message);
        self.drop_rejected_token(error)
    }

    /// A 401 means the stored token is no longer accepted; forget it.
    fn drop_rejected_token(&mut self, error: ClientError) -> ClientError {
        if error.status() == Some(StatusCode::UNAUTHORIZED) && self.session.is_authenticated() {
            warn!("Session token rejected by server, logging out");
            self.logout();
        }
        error
    }
}
