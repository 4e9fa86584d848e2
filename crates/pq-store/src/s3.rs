use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use pq_types::StorageKey;

use crate::backend::{ObjectBackend, ObjectBody};
use crate::error::{BackendError, BackendResult};

/// S3 error codes that mean the credentials are not good enough.
const DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

/// Amazon S3 (or S3-compatible) object backend.
///
/// The client is supplied by the caller and carries its own credentials,
/// retry policy and connection pool.
#[derive(Clone, Debug)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration (environment,
    /// profile, instance metadata), optionally overriding region and
    /// endpoint.
    pub async fn from_env(
        region: Option<String>,
        endpoint: Option<String>,
        force_path_style: bool,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(force_path_style);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self::new(Client::from_conf(builder.build()))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn classify<E, R>(err: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    if matches!(err, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)) {
        return BackendError::Unavailable(message);
    }
    let denied = err
        .as_service_error()
        .and_then(|e| e.code())
        .is_some_and(|code| DENIED_CODES.contains(&code));
    if denied {
        return BackendError::PermissionDenied(message);
    }
    BackendError::Service(Box::new(err))
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn bucket_exists(&self, bucket: &str) -> BackendResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(HeadBucketError::is_not_found) =>
            {
                Ok(false)
            }
            Err(err) => Err(classify(err)),
        }
    }

    async fn get(&self, bucket: &str, key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key.as_str())
            .send()
            .await;
        match response {
            Ok(output) => {
                let len = output.content_length().and_then(|n| u64::try_from(n).ok());
                Ok(Some(ObjectBody::new(output.body.into_async_read(), len)))
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key) =>
            {
                Ok(None)
            }
            Err(err) => Err(classify(err)),
        }
    }

    async fn put(&self, bucket: &str, key: &StorageKey, data: Bytes) -> BackendResult<()> {
        let len = i64::try_from(data.len())
            .map_err(|_| BackendError::InvalidKey(format!("{key}: object too large")))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key.as_str())
            .content_length(len)
            .content_type("application/graphql")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }
}
