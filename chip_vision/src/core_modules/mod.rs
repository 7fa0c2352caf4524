// THEORY:
// The core modules form a short chain, each layer only using the ones above it:
//
//     pixel -> color_profile -> mask -> blob_detector -> classifier
//     value_rule -> chip -> tracker -> session
//
// `template` sits on the side; it only prepares artwork for rendering.

pub mod blob_detector;
pub mod chip;
pub mod classifier;
pub mod color_profile;
pub mod mask;
pub mod pixel;
pub mod session;
pub mod template;
pub mod tracker;
pub mod value_rule;
