//! `inlineContent("body")` - sets the body a `<shunt>` response
//! synthesizes with.

use async_trait::async_trait;
use bytes::Bytes;
use pingora_http::ResponseHeader;
use pingora_proxy::Session;

use crate::proxy::context::FilterContext;
use crate::route::{Filter, FilterError, FilterSpec, Value};

pub struct InlineContent {
    body: Bytes,
}

#[async_trait]
impl Filter for InlineContent {
    async fn request(&self, _session: &mut Session, ctx: &mut FilterContext) -> pingora::Result<bool> {
        ctx.response_body = Some(self.body.clone());
        Ok(false)
    }

    fn response(
        &self,
        _session: &mut Session,
        response: &mut ResponseHeader,
        _ctx: &mut FilterContext,
    ) -> pingora::Result<()> {
        response.insert_header("content-length", self.body.len().to_string())?;
        Ok(())
    }
}

pub struct InlineContentSpec;
impl FilterSpec for InlineContentSpec {
    fn name(&self) -> &str {
        "inlineContent"
    }

    fn create_filter(&self, args: &[Value]) -> Result<std::sync::Arc<dyn Filter>, FilterError> {
        match args {
            [Value::Str(body)] => Ok(std::sync::Arc::new(InlineContent {
                body: Bytes::from(body.clone().into_bytes()),
            })),
            _ => Err(FilterError::Arity {
                name: "inlineContent".to_string(),
                expected: "1 string argument",
                got: args.len(),
            }),
        }
    }
}
