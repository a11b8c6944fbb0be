pub mod spatial_hash;
