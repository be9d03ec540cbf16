//! A blocking client for a REST collection of users, plus [`UsersPanel`],
//! the list/draft/edit state a front end binds to.

pub mod config;
pub mod error;
pub mod panel;
pub mod user;

use anyhow::Context;
use log::debug;
use reqwest::blocking::{Client, ClientBuilder, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use url::Url;

pub use config::ClientConfig;
pub use error::{ApiError, ErrorBody, Operation};
pub use panel::{EditState, UsersPanel};
pub use user::{NewUser, User, UserId};

/// The operations offered by the users endpoint. \
/// [`UsersPanel`] only talks to the server through this trait.
pub trait UsersApi {

    /// `GET /` - the whole collection
    fn list(&self) -> Result<Vec<User>, ApiError>;

    /// `POST /` - creates a user from the draft, returning it with its assigned id
    fn create(&self, draft: &NewUser) -> Result<User, ApiError>;

    /// `PUT /{id}` - replaces the user addressed by `user.id`
    fn update(&self, user: &User) -> Result<User, ApiError>;

    /// `DELETE /{id}`
    fn delete(&self, id: UserId) -> Result<(), ApiError>;

}

/// A wrapped reqwest [`Client`], that knows where the users collection lives
#[derive(Debug, Clone)]
pub struct UsersClient {
    pub client: Client,
    base_url: Url,
}

impl UsersClient {

    /// Builds a client from the given [`ClientConfig`]
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            client: Self::make_client(config)?,
            base_url: config.base_url.clone(),
        })
    }

    fn make_client(config: &ClientConfig) -> anyhow::Result<Client> {
        // Setup client with headers
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        default_headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)
            .context("User agent is not a valid header value")?);
        let mut builder = ClientBuilder::new()
            .default_headers(default_headers)
            .gzip(true);
        // Without a configured timeout, the transports default applies
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build().context("Could not build reqwest client")
    }

    /// The collection endpoint
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The endpoint of a single user: `{base_url}/{id}`
    pub fn user_url(&self, id: UserId) -> Url {
        let mut url = self.base_url.clone();
        // Validated config guarantees a base url, so this always succeeds
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        url
    }

    /// Sends the request and turns non 2xx responses into [`ApiError::Status`]
    fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, ApiError> {
        let response = request.send().map_err(|e| ApiError::transport(&e))?;
        let status = response.status();
        debug!("{} answered {}", url, status);
        if status.is_success() {
            return Ok(response);
        }
        // The body might still carry a reason, but it may also be missing
        let body = response.text().ok().and_then(|text| ErrorBody::parse(&text));
        Err(ApiError::Status {
            url: url.clone(),
            status,
            body,
        })
    }

    /// Like [`UsersClient::send()`], but also parses the json body
    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &Url) -> Result<T, ApiError> {
        let response = self.send(request, url)?;
        let text = response.text().map_err(|e| ApiError::transport(&e))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })
    }

}

macro_rules! impl_client_wrap {
    ($($name:ident => $method:ident),+) => {
        impl UsersClient {
            $(
                fn $name(&self, url: Url) -> RequestBuilder {
                    debug!("{}: {}", stringify!($method).to_uppercase(), url.as_str());
                    self.client.$method(url)
                }
            )+
        }
    };
}

impl_client_wrap!(get_request => get, post_request => post, put_request => put, delete_request => delete);

impl UsersApi for UsersClient {

    fn list(&self) -> Result<Vec<User>, ApiError> {
        let url = self.base_url.clone();
        self.send_json(self.get_request(url.clone()), &url)
    }

    fn create(&self, draft: &NewUser) -> Result<User, ApiError> {
        let url = self.base_url.clone();
        self.send_json(self.post_request(url.clone()).json(draft), &url)
    }

    fn update(&self, user: &User) -> Result<User, ApiError> {
        let url = self.user_url(user.id);
        self.send_json(self.put_request(url.clone()).json(user), &url)
    }

    fn delete(&self, id: UserId) -> Result<(), ApiError> {
        // Whatever the server sends back is not needed
        let url = self.user_url(id);
        self.send(self.delete_request(url.clone()), &url).map(drop)
    }

}
