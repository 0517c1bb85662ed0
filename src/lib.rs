// Crate entry point. Declares and exposes modules; no business logic here.

pub mod shared {
    pub mod core {
        pub mod clock;
        pub mod primitives;
    }
    pub mod infrastructure {
        pub mod deferred;
        pub mod durable_store;
        pub mod read_cache;
    }
}

pub mod modules {
    pub mod time_entries {
        pub mod core {
            pub mod active_timer;
            pub mod cache_keys;
            pub mod elapsed;
            pub mod summaries;
            pub mod time_entry;
        }
        pub mod use_cases {
            pub mod track_time {
                pub mod config;
                pub mod errors;
                pub mod pending_writes;
                pub mod session;
                pub mod ticker;
            }
            pub mod query_time_entries {
                pub mod handler;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod remote;
                pub mod remote_in_memory;
            }
        }
    }
}

pub mod shell;
