mod chain_recovery;
mod gos_cache;
mod label_table;
mod request_table;
mod rotary_id;
