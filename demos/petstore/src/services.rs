use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{Pet, PetIn, PetUpdate};

#[derive(Clone, Default)]
pub struct PetService {
    pets: Arc<RwLock<BTreeMap<u64, Pet>>>,
    next_id: Arc<AtomicU64>,
}

impl PetService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `pets`, created in order.
    pub async fn with_pets(pets: impl IntoIterator<Item = PetIn>) -> Self {
        let service = Self::new();
        for pet in pets {
            service.create(pet).await;
        }
        service
    }

    pub async fn create(&self, pet: PetIn) -> Pet {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let pet = Pet {
            id,
            name: pet.name,
            category: pet.category,
        };
        self.pets.write().await.insert(id, pet.clone());
        tracing::info!(id, name = %pet.name, "Pet created");
        pet
    }

    pub async fn get(&self, id: u64) -> Option<Pet> {
        self.pets.read().await.get(&id).cloned()
    }

    /// One page of pets ordered by id, and the total matching `category`.
    pub async fn page(&self, category: Option<&str>, offset: u64, limit: u64) -> (Vec<Pet>, u64) {
        let pets = self.pets.read().await;
        let matching = pets
            .values()
            .filter(|pet| category.map_or(true, |c| pet.category == c));
        let total = matching.clone().count() as u64;
        let page = matching
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        (page, total)
    }

    pub async fn update(&self, id: u64, update: PetUpdate) -> Option<Pet> {
        let mut pets = self.pets.write().await;
        let pet = pets.get_mut(&id)?;
        if let Some(name) = update.name {
            pet.name = name;
        }
        if let Some(category) = update.category {
            pet.category = category;
        }
        Some(pet.clone())
    }

    pub async fn delete(&self, id: u64) -> bool {
        let removed = self.pets.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(id, "Pet deleted");
        }
        removed
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
}

/// Known accounts, shared by the basic-auth routes and `POST /tokens`.
#[derive(Clone, Default)]
pub struct UserDirectory {
    accounts: Arc<HashMap<String, Account>>,
}

impl UserDirectory {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: Arc::new(
                accounts
                    .into_iter()
                    .map(|account| (account.username.clone(), account))
                    .collect(),
            ),
        }
    }

    pub fn demo() -> Self {
        Self::new([
            Account {
                username: "user".into(),
                password: "pass".into(),
                roles: vec!["user".into()],
            },
            Account {
                username: "admin".into(),
                password: "admin-pass".into(),
                roles: vec!["user".into(), "admin".into()],
            },
        ])
    }

    pub fn verify(&self, username: &str, password: &str) -> Option<Account> {
        self.accounts
            .get(username)
            .filter(|account| account.password == password)
            .cloned()
    }
}
