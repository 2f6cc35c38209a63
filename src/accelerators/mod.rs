//! Spatial acceleration structures: the indexed kd-tree used for
//! photon/vertex density lookups (§4.I).

pub mod kdtree;
