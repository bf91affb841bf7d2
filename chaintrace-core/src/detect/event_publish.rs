//! Event publish calls: `publisher.publishEvent(topic, payload)`.

use tracing::{debug, info};

use super::{resolve_topic, UsageDetector};
use crate::error::ChainTraceResult;
use crate::model::{Expr, ExprId};
use crate::usage::EventPublishUsage;

impl UsageDetector<'_> {
    /// Finds publish calls on receivers that are, or implement, the publisher type.
    pub fn detect_event_publishes(&self) -> ChainTraceResult<Vec<EventPublishUsage>> {
        self.conventions.validate()?;
        info!("Detecting event publish usages");

        let usages = self.scan(self.model.invocations(), "call expression", |id, expr| {
            self.inspect_publish(id, expr)
        });

        info!("Found {} event publish usages", usages.len());
        Ok(usages)
    }

    fn inspect_publish(&self, id: ExprId, expr: &Expr) -> ChainTraceResult<Option<EventPublishUsage>> {
        let Some(call) = expr.as_invocation() else {
            return Ok(None);
        };
        if call.executable.name != self.conventions.publish_method {
            return Ok(None);
        }
        let Some(target) = call.target else {
            return Ok(None);
        };
        let Some(receiver_type) = self.model.require_expr(target)?.static_type_name() else {
            return Ok(None);
        };
        if !self.model.implements(receiver_type, &self.conventions.publisher_type) {
            return Ok(None);
        }
        let (Some(topic), Some(payload)) = (
            self.argument(&call.arguments, 0)?,
            self.argument(&call.arguments, 1)?,
        ) else {
            return Ok(None);
        };

        let topic = resolve_topic(self.model, topic)?;
        debug!(topic = %topic.name, status = %topic.status, "Found event publish");

        Ok(Some(EventPublishUsage {
            topic_name: topic.name,
            topic_status: topic.status,
            topic_variable_type: topic.variable_type,
            usage_location: self.source_location(expr),
            call_chains: self.call_chains(id),
            message_data_type: payload.static_type_name().map(str::to_string),
        }))
    }
}
