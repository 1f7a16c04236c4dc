mod dynamodb;
mod s3;

pub use dynamodb::{DynamoDbConfig, DynamoDbKvStore};
pub use s3::{S3BlobStore, S3Config};
