pub mod bookmark_store;
pub mod classify_service;
pub mod folder_collector;
pub mod folder_resolver;
pub mod inference_client;
pub mod name_normalizer;
pub mod organize_service;
pub mod preference_store;
pub mod provider_service;
pub mod secret_store;
