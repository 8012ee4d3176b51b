//! Batch aggregation pipeline turning OCP and AWS CUR Parquet partitions
//! into daily per-cluster/per-namespace summary rows in a Postgres warehouse.

pub mod attribution;
pub mod coordinator;
pub mod decode;
pub mod error;
pub mod labels;
pub mod matcher;
pub mod model;
pub mod ocp_aggregate;
pub mod ocp_on_aws;
pub mod reader;
pub mod summary;
pub mod tagkeys;
pub mod unallocated;
pub mod warehouse;
