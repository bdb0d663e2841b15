pub mod classification;
pub mod folder_node;
pub mod organize;
pub mod provider;
