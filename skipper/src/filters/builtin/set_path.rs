//! `setPath("/new/path")` - replaces the request URI's path, preserving its
//! query string. A `<loopback>` re-entry re-matches against the new path.

use std::str::FromStr;

use async_trait::async_trait;
use http::uri::{PathAndQuery, Uri};
use pingora_proxy::Session;

use crate::proxy::context::FilterContext;
use crate::route::{Filter, FilterError, FilterSpec, Value};

pub struct SetPath {
    path: String,
}

#[async_trait]
impl Filter for SetPath {
    async fn request(&self, session: &mut Session, _ctx: &mut FilterContext) -> pingora::Result<bool> {
        let header = session.req_header_mut();
        let new_uri = rewrite_path(&header.uri, &self.path)
            .map_err(|_| pingora::Error::new_str("setPath: failed to rebuild request URI"))?;
        header.set_uri(new_uri);
        Ok(false)
    }
}

fn rewrite_path(original: &Uri, path: &str) -> Result<Uri, String> {
    let new_p_and_q_str = match original.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let new_p_and_q =
        PathAndQuery::from_str(&new_p_and_q_str).map_err(|e| format!("invalid path: {e}"))?;

    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(new_p_and_q);
    Uri::from_parts(parts).map_err(|e| format!("failed to reassemble uri: {e}"))
}

pub struct SetPathSpec;
impl FilterSpec for SetPathSpec {
    fn name(&self) -> &str {
        "setPath"
    }

    fn create_filter(&self, args: &[Value]) -> Result<std::sync::Arc<dyn Filter>, FilterError> {
        match args {
            [Value::Str(path)] => Ok(std::sync::Arc::new(SetPath { path: path.clone() })),
            _ => Err(FilterError::Arity {
                name: "setPath".to_string(),
                expected: "1 string argument",
                got: args.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_query_string() {
        let original: Uri = "/old/path?a=1&b=2".parse().unwrap();
        let rewritten = rewrite_path(&original, "/new/path").unwrap();
        assert_eq!(rewritten.path(), "/new/path");
        assert_eq!(rewritten.query(), Some("a=1&b=2"));
    }

    #[test]
    fn rewrites_without_query() {
        let original: Uri = "/old/path".parse().unwrap();
        let rewritten = rewrite_path(&original, "/b").unwrap();
        assert_eq!(rewritten.to_string(), "/b");
    }
}
