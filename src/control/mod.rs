//! Control protocol for bidirectional communication with the CLI
//!
//! Every line crossing the SDK↔CLI boundary is a single JSON object. This
//! module owns the envelopes: outbound control requests with generated
//! request ids, control responses in both directions, and classification of
//! inbound frames. The client owns correlation and dispatch; the codec is
//! pure data.

mod codec;

pub use codec::{
    ControlResponseFrame, InboundControlRequest, InboundFrame, OutboundRequest,
    RequestIdGenerator, decode_frame, encode_error_response, encode_request,
    encode_success_response, encode_user_message, parse_inbound_request,
};
