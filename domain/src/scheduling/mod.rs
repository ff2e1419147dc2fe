//! Resource scheduling
//!
//! A [`SchedulingRequest`](request::SchedulingRequest) asks for a slot on a
//! resource of some category. The
//! [`SchedulingStrategyEngine`](engine::SchedulingStrategyEngine) ranks the
//! eligible [`ResourceDescriptor`](resource::ResourceDescriptor)s using their
//! [`ResourceLoad`](load::ResourceLoad), and a confirmed choice becomes an
//! [`Allocation`](allocation::Allocation).

pub mod allocation;
pub mod engine;
pub mod load;
pub mod request;
pub mod resource;
pub mod strategy;
