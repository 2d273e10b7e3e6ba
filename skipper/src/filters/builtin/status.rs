//! `status(201)` - sets the status a `<shunt>` (or default-status) response
//! synthesizes with.

use async_trait::async_trait;
use pingora_http::ResponseHeader;
use pingora_proxy::Session;

use crate::proxy::context::FilterContext;
use crate::route::{Filter, FilterError, FilterSpec, Value};

pub struct Status {
    code: u16,
}

#[async_trait]
impl Filter for Status {
    async fn request(&self, _session: &mut Session, ctx: &mut FilterContext) -> pingora::Result<bool> {
        ctx.response_status = Some(self.code);
        Ok(false)
    }

    fn response(
        &self,
        _session: &mut Session,
        response: &mut ResponseHeader,
        _ctx: &mut FilterContext,
    ) -> pingora::Result<()> {
        if let Ok(code) = http::StatusCode::from_u16(self.code) {
            response.set_status(code)?;
        }
        Ok(())
    }
}

pub struct StatusSpec;
impl FilterSpec for StatusSpec {
    fn name(&self) -> &str {
        "status"
    }

    fn create_filter(&self, args: &[Value]) -> Result<std::sync::Arc<dyn Filter>, FilterError> {
        match args {
            [code] => {
                let code = code.as_i64().ok_or_else(|| FilterError::InvalidArgument {
                    name: "status".to_string(),
                    index: 0,
                    reason: "expected an integer status code".to_string(),
                })?;
                Ok(std::sync::Arc::new(Status { code: code as u16 }))
            }
            _ => Err(FilterError::Arity {
                name: "status".to_string(),
                expected: "1 integer argument",
                got: args.len(),
            }),
        }
    }
}
