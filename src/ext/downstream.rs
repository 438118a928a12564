//! Connection contract for resource servers reached with an acquired access token.

// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
};

/// Boxed future returned by [`DownstreamResource::connect`].
pub type ConnectFuture<'a, S, E> = Pin<Box<dyn Future<Output = Result<S, E>> + 'a + Send>>;

/// Opens sessions against a resource server that accepts bearer access tokens.
///
/// The token is borrowed for the duration of the call only; implementations must not
/// retain or log it.
pub trait DownstreamResource
where
	Self: Send + Sync,
{
	/// Session handle produced by a successful connection.
	type Session: Send;
	/// Failure reported by the resource.
	type Error: 'static + Send + Sync + StdError;

	/// Opens a session authenticated with `access_token`.
	fn connect<'a>(
		&'a self,
		access_token: &'a TokenSecret,
	) -> ConnectFuture<'a, Self::Session, Self::Error>;
}

/// Convenience helpers over [`DownstreamResource`].
pub trait DownstreamResourceExt
where
	Self: DownstreamResource,
{
	/// Connects with the access token of `record`.
	fn connect_with<'a>(
		&'a self,
		record: &'a TokenRecord,
	) -> ConnectFuture<'a, Self::Session, Self::Error> {
		self.connect(&record.access_token)
	}
}
impl<T> DownstreamResourceExt for T where T: ?Sized + DownstreamResource {}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ScopeSet;

	#[derive(Debug, ThisError)]
	#[error("Token rejected.")]
	struct Rejected;

	struct Database;
	impl DownstreamResource for Database {
		type Error = Rejected;
		type Session = usize;

		fn connect<'a>(
			&'a self,
			access_token: &'a TokenSecret,
		) -> ConnectFuture<'a, Self::Session, Self::Error> {
			Box::pin(async move {
				if access_token.is_empty() {
					Err(Rejected)
				} else {
					Ok(access_token.expose().len())
				}
			})
		}
	}

	#[tokio::test]
	async fn sessions_open_with_the_record_access_token() {
		let record = TokenRecord::builder(
			ScopeSet::new(["https://db.example.net/user_impersonation"])
				.expect("Scope fixture should be valid."),
		)
		.access_token("abc")
		.expires_in(Duration::minutes(30))
		.build()
		.expect("Record fixture should build.");
		let session = Database.connect_with(&record).await.expect("Connection should succeed.");

		assert_eq!(session, 3);
		assert!(Database.connect(&TokenSecret::new("")).await.is_err());
	}
}
