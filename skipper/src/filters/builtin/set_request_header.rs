//! `setRequestHeader(name, value)` - replaces a request header before it
//! reaches the matching loop's next iteration or the upstream request.

use async_trait::async_trait;
use pingora_proxy::Session;

use crate::proxy::context::FilterContext;
use crate::route::{Filter, FilterError, FilterSpec, Value};

pub struct SetRequestHeader {
    name: String,
    value: String,
}

#[async_trait]
impl Filter for SetRequestHeader {
    async fn request(&self, session: &mut Session, _ctx: &mut FilterContext) -> pingora::Result<bool> {
        let header = session.req_header_mut();
        header.remove_header(&self.name);
        header.append_header(self.name.clone(), &self.value)?;
        Ok(false)
    }
}

pub struct SetRequestHeaderSpec;
impl FilterSpec for SetRequestHeaderSpec {
    fn name(&self) -> &str {
        "setRequestHeader"
    }

    fn create_filter(&self, args: &[Value]) -> Result<std::sync::Arc<dyn Filter>, FilterError> {
        match args {
            [Value::Str(name), Value::Str(value)] => Ok(std::sync::Arc::new(SetRequestHeader {
                name: name.clone(),
                value: value.clone(),
            })),
            _ => Err(FilterError::Arity {
                name: "setRequestHeader".to_string(),
                expected: "2 string arguments (name, value)",
                got: args.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_arity() {
        let spec = SetRequestHeaderSpec;
        assert!(spec.create_filter(&[Value::Str("X-A".into())]).is_err());
    }
}
