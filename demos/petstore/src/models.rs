use apiweave::prelude::*;
use apiweave::schema::pagination_schema;
use apiweave::validate::{FileSize, FileType, Length, OneOf, Range, MB};
use serde::{Deserialize, Serialize};

pub const CATEGORIES: [&str; 2] = ["dog", "cat"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: u64,
    pub name: String,
    pub category: String,
}

impl ApiSchema for Pet {
    fn schema() -> Schema {
        Schema::new("Pet")
            .field("id", fields::integer().dump_only().example(1))
            .field("name", fields::string().example("Buddy"))
            .field("category", fields::string().example("dog"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PetIn {
    pub name: String,
    pub category: String,
}

impl ApiSchema for PetIn {
    fn schema() -> Schema {
        Schema::new("PetIn")
            .field(
                "name",
                fields::string()
                    .required()
                    .validate(Length::new().min(1).max(10)),
            )
            .field(
                "category",
                fields::string().required().validate(OneOf::new(CATEGORIES)),
            )
    }
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PetUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
}

impl ApiSchema for PetUpdate {
    fn schema() -> Schema {
        Schema::new("PetUpdate")
            .field("name", fields::string().validate(Length::new().min(1).max(10)))
            .field("category", fields::string().validate(OneOf::new(CATEGORIES)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PetId {
    pub pet_id: u64,
}

pub fn pet_id() -> Schema {
    Schema::inline().field(
        "pet_id",
        fields::integer().required().validate(Range::new().min(1)),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: u64,
    pub per_page: u64,
    pub category: Option<String>,
}

pub fn page_query() -> Schema {
    Schema::inline()
        .field(
            "page",
            fields::integer().load_default(1).validate(Range::new().min(1)),
        )
        .field(
            "per_page",
            fields::integer()
                .load_default(20)
                .validate(Range::new().min(1).max(30)),
        )
        .field("category", fields::string().validate(OneOf::new(CATEGORIES)))
}

pub fn pets_out() -> Schema {
    Schema::new("Pets")
        .field("pets", fields::list(fields::nested_of::<Pet>()))
        .field("pagination", fields::nested(pagination_schema()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub fn credentials() -> Schema {
    Schema::new("Credentials")
        .field("username", fields::string().required())
        .field("password", fields::string().required().load_only())
}

pub fn token_out() -> Schema {
    Schema::new("Token")
        .field("token", fields::string())
        .field("token_type", fields::string().example("Bearer"))
}

#[derive(Debug, Deserialize)]
pub struct ImageUpload {
    pub image: UploadedFile,
    pub description: Option<String>,
}

pub fn image_upload() -> Schema {
    Schema::new("ImageUpload")
        .field(
            "image",
            fields::file()
                .required()
                .validate(FileType::new([".png", ".jpg", ".jpeg", ".gif"]))
                .validate(FileSize::new().max(5 * MB)),
        )
        .field("description", fields::string())
}

pub fn image_out() -> Schema {
    Schema::new("Image")
        .field("filename", fields::string())
        .field("content_type", fields::string().allow_none())
        .field("size", fields::integer())
        .field("description", fields::string().allow_none())
}
