//! Filtered user listing.
//!
//! A `UserFilter<T>` names a query parameter and fixes the type of its
//! value, so a filter can only be given a value of the right type:
//!
//! ```compile_fail
//! # fn demo(api: &flux_core::FluxApi) {
//! use flux_core::filter::GROUP_ID;
//! let _ = api.registered_users().with_filter(&GROUP_ID, true);
//! # }
//! ```
//!
//! New filters need no change to the builder:
//! `UserFilter::<bool>::new("has_avatar")`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::FluxError;
use crate::request::{decode_field, RequestHandler};
use crate::types::UserInfo;
use crate::user::FluxUser;

/// A value a filter can be compared against. Rendered into the query string
/// with `to_string` semantics.
pub trait FilterValue {
    fn to_query_value(&self) -> String;
}

impl FilterValue for bool {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl FilterValue for i64 {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl FilterValue for String {
    fn to_query_value(&self) -> String {
        self.clone()
    }
}

/// A named user filter whose value has type `T`.
pub struct UserFilter<T> {
    name: Cow<'static, str>,
    value: PhantomData<fn(T)>,
}

pub const BANNED: UserFilter<bool> = UserFilter::new("banned");
pub const VERIFIED: UserFilter<bool> = UserFilter::new("verified");
pub const DISCORD_LINKED: UserFilter<bool> = UserFilter::new("discord_linked");
pub const GROUP_ID: UserFilter<i64> = UserFilter::new("group_id");

impl<T: FilterValue> UserFilter<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            value: PhantomData,
        }
    }

    /// A filter whose name is only known at runtime.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            value: PhantomData,
        }
    }
}

impl<T> UserFilter<T> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for UserFilter<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for UserFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserFilter").field(&self.name).finish()
    }
}

/// Accumulates filters and lists the matching users in one request.
///
/// Each `with_filter` consumes the builder and returns the extended one.
/// Setting the same filter twice keeps the last value.
#[derive(Debug, Clone)]
#[must_use]
pub struct FilteredUserListBuilder {
    requests: Arc<RequestHandler>,
    filters: BTreeMap<String, String>,
}

impl FilteredUserListBuilder {
    pub fn new(requests: Arc<RequestHandler>) -> Self {
        Self {
            requests,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_filter<T: FilterValue>(mut self, filter: &UserFilter<T>, value: T) -> Self {
        self.filters
            .insert(filter.name().to_string(), value.to_query_value());
        self
    }

    /// The accumulated filters as query pairs, ordered by name.
    pub fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// List every user matching all filters. Each call is a new request.
    pub fn execute(&self) -> Result<Vec<FluxUser>, FluxError> {
        let query: Vec<(&str, &str)> = self.filters().collect();
        let mut envelope = self.requests.get("users", &query)?;
        let users: Vec<UserInfo> = decode_field(&mut envelope, "users")?;
        Ok(users
            .into_iter()
            .map(|info| FluxUser::from_info(Arc::clone(&self.requests), info))
            .collect())
    }
}
