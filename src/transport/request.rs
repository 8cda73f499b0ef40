//! Request descriptors that can be turned into a fresh request per attempt.

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method, RequestBuilder};
use tokio_util::io::ReaderStream;

use crate::common::{Credentials, FileSource, UploadError};

/// Multipart body: text fields followed by one file part.
#[derive(Debug, Clone)]
pub struct MultipartSpec {
    pub fields: Vec<(&'static str, String)>,
    pub file_field: &'static str,
    pub file_name: String,
    pub file_size: u64,
    pub source: FileSource,
}

impl MultipartSpec {
    // Files on disk are re-opened for each attempt so a retry never sees a
    // partially consumed stream.
    async fn form(&self) -> Result<Form, UploadError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(*name, value.clone());
        }

        let part = match &self.source {
            FileSource::Memory(data) => {
                Part::stream_with_length(Body::from(data.clone()), self.file_size)
            }
            FileSource::Path(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| UploadError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), self.file_size)
            }
        };

        Ok(form.part(self.file_field, part.file_name(self.file_name.clone())))
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartSpec),
}

/// Target, method, credentials and body of one logical request. The
/// credentials are borrowed from the caller for the lifetime of the request.
#[derive(Debug, Clone)]
pub struct RequestSpec<'a> {
    pub method: Method,
    pub url: String,
    pub credentials: Option<&'a Credentials>,
    pub body: RequestBody,
}

impl<'a> RequestSpec<'a> {
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            credentials: None,
            body: RequestBody::Json(body),
        }
    }

    pub fn post_multipart(url: impl Into<String>, body: MultipartSpec) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            credentials: None,
            body: RequestBody::Multipart(body),
        }
    }

    pub fn with_credentials(mut self, credentials: &'a Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub(crate) async fn build(&self, client: &reqwest::Client) -> Result<RequestBuilder, UploadError> {
        let mut builder = client.request(self.method.clone(), &self.url);

        if let Some(credentials) = self.credentials {
            builder = builder.basic_auth(credentials.username(), Some(credentials.password()));
        }

        let builder = match &self.body {
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(spec) => builder.multipart(spec.form().await?),
        };

        Ok(builder)
    }
}
