use destiny_core::{HeaderGenerator, HeaderParameter};
use uuid::Uuid;

use crate::endpoint::InboundRequest;
use crate::workflow::Workflow;

pub const POWERED_BY_HEADER: &str = "X-Powered-By";
pub const POWERED_BY: &str = "Destiny";

/// Produce the per-request headers into the client or internal set.
pub(crate) fn generate(params: &[HeaderParameter], request: &InboundRequest, wf: &mut Workflow) {
    wf.output_header(POWERED_BY_HEADER, POWERED_BY);

    for hp in params {
        let mut value = match &hp.generator {
            HeaderGenerator::Static(v) => Some(v.clone()),
            HeaderGenerator::Unknown(g) => {
                tracing::warn!(target: "destiny", "unknown header generator '{g}' for {}", hp.name);
                continue;
            }
            g if g.forwards() => request.header_value(&hp.name).map(str::to_string),
            _ => None,
        };
        if value.is_none() {
            if hp.generator.falls_back_to_guid() {
                value = Some(Uuid::new_v4().to_string());
            } else if hp.generator.falls_back_to_ip() {
                value = request.remote_ip.clone();
            }
        }
        let Some(value) = value else {
            continue;
        };

        let headers = wf.headers_mut();
        if hp.return_in_response {
            headers.client.insert(hp.name.clone(), value);
        } else {
            headers.internal.insert(hp.name.clone(), value);
        }
    }
}
