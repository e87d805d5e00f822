//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::payments::StripeService;
use crate::social::{PostPublisher, SocialClient};
use crate::store::{
    CartStore, OrderStore, ProductStore, ScheduledPostStore, SupabaseClient, UserStore,
};
use crate::util::rate_limit::{KeyedRateLimiter, LOGIN_RATE_LIMIT, REGISTER_RATE_LIMIT};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_store: UserStore,
    pub product_store: ProductStore,
    pub cart_store: CartStore,
    pub order_store: OrderStore,
    pub post_store: ScheduledPostStore,
    pub stripe: StripeService,
    pub social: SocialClient,
    pub publisher: Arc<PostPublisher>,
    pub login_limiter: KeyedRateLimiter,
    pub register_limiter: KeyedRateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize Supabase client
        let supabase = SupabaseClient::new(&config);

        // Initialize stores
        let user_store = UserStore::new(supabase.clone());
        let product_store = ProductStore::new(supabase.clone());
        let cart_store = CartStore::new(supabase.clone());
        let order_store = OrderStore::new(supabase.clone());
        let post_store = ScheduledPostStore::new(supabase.clone());

        // Initialize Stripe
        let stripe = StripeService::new(&config, cart_store.clone(), order_store.clone());

        // Initialize social platform client and publisher
        // (Arc for sharing across cloned AppState)
        let social = SocialClient::new(&config);
        let publisher = Arc::new(PostPublisher::new(
            post_store.clone(),
            social.clone(),
            config.post_publish_interval_secs,
        ));

        Self {
            config,
            user_store,
            product_store,
            cart_store,
            order_store,
            post_store,
            stripe,
            social,
            publisher,
            login_limiter: KeyedRateLimiter::new(LOGIN_RATE_LIMIT),
            register_limiter: KeyedRateLimiter::new(REGISTER_RATE_LIMIT),
        }
    }
}
