//! Users API demonstrating list queries over an in-memory store
//!
//! ```text
//! GET /users?q=smith&page=1&limit=5
//! GET /users?sorts=lastName:asc,createdAt:desc&fields=id,lastName
//! GET /users?dateRange.from=2024-03-01&all=true
//! GET /orders?sortBy=total&order=ASC
//! ```

use axum::extract::Query;
use chrono::{Duration, TimeZone};
use this_query::prelude::*;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRow {
    id: u32,
    first_name: String,
    last_name: String,
    email: String,
    created_at: DateTime<Utc>,
}

struct User;

impl_queryable_entity!(
    User,
    "users",
    fields: ["id", "firstName", "lastName", "email", "createdAt"],
    searchable: ["firstName", "lastName", "email"]
);

const CONFIG: &str = r#"
defaults:
  default_page_size: 5
  default_sort_field: total
  date_field: placedAt
entities:
  - name: orders
    fields: [id, customer, total, placedAt]
    searchable_fields: [customer]
"#;

#[derive(Clone)]
struct OrdersState {
    store: Arc<InMemoryStore>,
    config: Arc<QueryConfig>,
}

/// Config-driven list handler, no compile-time entity type involved
async fn list_orders(
    State(state): State<OrdersState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<Value>>>, QueryError> {
    let entity = state.config.entity("orders")?;
    let raw = RawParameters::from_query_pairs(pairs);
    let spec = QuerySpec::from_raw_parameters_with(&raw, &entity.field_set(), &state.config.defaults)?;
    let response = find_and_count(state.store.as_ref(), &spec, &entity.list_options(None)).await?;
    Ok(Json(ApiResponse::paginated(response)))
}

fn seed_users() -> Vec<UserRow> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let names = [
        ("Ada", "Lovelace"),
        ("Alan", "Turing"),
        ("Grace", "Hopper"),
        ("Edsger", "Dijkstra"),
        ("Barbara", "Liskov"),
        ("Donald", "Knuth"),
        ("Frances", "Allen"),
        ("John", "Smith"),
        ("Jane", "Smithson"),
        ("Ken", "Thompson"),
        ("Dennis", "Ritchie"),
        ("Margaret", "Hamilton"),
    ];
    names
        .iter()
        .enumerate()
        .map(|(i, (first, last))| UserRow {
            id: i as u32 + 1,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
            created_at: start + Duration::days(i as i64 * 14),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,this_query=debug")),
        )
        .init();

    let users = Arc::new(InMemoryStore::new());
    for user in seed_users() {
        users.insert(&user).await?;
    }

    let orders = Arc::new(InMemoryStore::with_records(vec![
        json!({ "id": 1, "customer": "Ada Lovelace", "total": 120.5, "placedAt": "2024-02-01T10:00:00Z" }),
        json!({ "id": 2, "customer": "Alan Turing", "total": 35.0, "placedAt": "2024-02-14T16:30:00Z" }),
        json!({ "id": 3, "customer": "Ada Lovelace", "total": 980.0, "placedAt": "2024-03-03T08:15:00Z" }),
        json!({ "id": 4, "customer": "Grace Hopper", "total": 12.75, "placedAt": "2024-03-21T12:00:00Z" }),
    ]));
    let config = Arc::new(QueryConfig::from_yaml_str(CONFIG)?);

    let orders_router = Router::new()
        .route("/orders", get(list_orders))
        .with_state(OrdersState {
            store: orders,
            config,
        });

    let app = list_router::<User, Value, _>(users)
        .merge(orders_router)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;

    println!("🚀 Users API running on http://127.0.0.1:3000");
    println!("\n📚 Routes:");
    println!("    GET    /users   - List users (search, sort, project, paginate)");
    println!("    GET    /orders  - List orders (config-driven)");
    println!("\n💡 Try:");
    println!("    curl 'http://127.0.0.1:3000/users?q=smith'");
    println!("    curl 'http://127.0.0.1:3000/users?sorts=lastName:asc&fields=id,lastName&limit=3'");
    println!("    curl 'http://127.0.0.1:3000/users?page=0'");

    axum::serve(listener, app).await?;
    Ok(())
}
