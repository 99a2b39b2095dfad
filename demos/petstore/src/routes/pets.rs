use apiweave::http::State;
use apiweave::prelude::*;
use serde_json::json;

use crate::models::{page_query, pet_id, pets_out, PageQuery, Pet, PetId, PetIn, PetUpdate};
use crate::state::AppState;

async fn list_pets(
    State(state): State<AppState>,
    url: RequestUrl,
    QueryArgs(query): QueryArgs<PageQuery>,
) -> Reply {
    let pagination = Pagination::new(query.page, query.per_page, 0);
    let (pets, total) = state
        .pets
        .page(query.category.as_deref(), pagination.offset(), pagination.per_page)
        .await;
    let pagination = Pagination::new(query.page, query.per_page, total);
    Reply::new(json!({
        "pets": pets,
        "pagination": pagination_builder(&pagination, &url, &[]),
    }))
}

async fn create_pet(State(state): State<AppState>, JsonBody(pet): JsonBody<PetIn>) -> Reply {
    Reply::new(state.pets.create(pet).await)
}

async fn get_pet(
    State(state): State<AppState>,
    PathArgs(path): PathArgs<PetId>,
) -> Result<Reply, HttpError> {
    match state.pets.get(path.pet_id).await {
        Some(pet) => Ok(Reply::new(pet)),
        None => abort(404, Some("Pet not found.")),
    }
}

async fn update_pet(
    State(state): State<AppState>,
    PathArgs(path): PathArgs<PetId>,
    JsonBody(update): JsonBody<PetUpdate>,
) -> Result<Reply, HttpError> {
    match state.pets.update(path.pet_id, update).await {
        Some(pet) => Ok(Reply::new(pet)),
        None => abort(404, Some("Pet not found.")),
    }
}

async fn delete_pet(
    State(state): State<AppState>,
    PathArgs(path): PathArgs<PetId>,
) -> Result<Reply, HttpError> {
    if state.pets.delete(path.pet_id).await {
        Ok(Reply::empty())
    } else {
        abort(404, Some("Pet not found."))
    }
}

/// `/pets`: deleting requires an `admin` token.
pub fn routes(admin: AuthRequirement) -> RouteGroup<AppState> {
    RouteGroup::new("pets")
        .prefix("/pets")
        .route(
            Route::get("", list_pets)
                .input(page_query(), Location::Query)
                .output(pets_out(), 200)
                .doc(Doc::new().summary("List pets")),
        )
        .route(
            Route::post("", create_pet)
                .input(SchemaRef::of::<PetIn>(), Location::Json)
                .output(SchemaRef::of::<Pet>(), 201)
                .doc(Doc::new().description("Add a pet. Category must be dog or cat.")),
        )
        .route(
            Route::get("/{pet_id}", get_pet)
                .input(pet_id(), Location::Path)
                .output(SchemaRef::of::<Pet>(), 200),
        )
        .route(
            Route::patch("/{pet_id}", update_pet)
                .input(pet_id(), Location::Path)
                .input(SchemaRef::of::<PetUpdate>(), Location::Json)
                .output(SchemaRef::of::<Pet>(), 200),
        )
        .route(
            Route::delete("/{pet_id}", delete_pet)
                .input(pet_id(), Location::Path)
                .output(empty_schema(), 204)
                .auth_required_with(admin),
        )
}
