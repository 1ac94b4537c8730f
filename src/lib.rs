//! # Upload Presign Server
//!
//! Upload Presign Server issues short lived, pre-signed upload urls for an
//! S3 bucket, together with a fresh object key and the public url the object
//! will be served from once the client has uploaded it.
//!
//! ## Design
//!
//! The crate is build around a single abstraction.
//!
//! - UploadSigner: This trait is responsible for signing a `PUT` of one
//! object with a fixed content type. [`signer::s3::S3UploadSigner`] signs
//! with the AWS SDK; tests substitute their own implementation.
//!
//! Everything else is policy: how keys are derived ([`key`]), how public urls
//! are built ([`config::PresignConfig::public_url`]) and how the HTTP endpoint
//! behaves ([`router`]).
//!

#![warn(missing_docs)]

pub mod config;
pub mod key;
pub mod signer;

pub mod error;
pub mod extract;
pub mod response;
pub mod router;
pub mod state;
