use cityfare_core::db::open_db_in_memory;
use cityfare_core::{
    CityRepo, DocId, DocumentStore, Filter, Patch, Pipeline, RelationError, RelationService,
    RestaurantRepo, SqliteDocumentStore, StoreResult, RESTAURANTS,
};
use serde_json::{json, Value};
use uuid::Uuid;

#[test]
fn link_restaurant_twice_keeps_one_reference() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let giralda = restaurants
        .create_restaurant("La Giralda", Some("Calle Betis"), madrid.id)
        .unwrap();

    relations.link_restaurant(madrid.id, giralda.id).unwrap();
    let city = relations.link_restaurant(madrid.id, giralda.id).unwrap();

    assert_eq!(city.restaurants.len(), 1);
    assert!(city.references(giralda.id));
}

#[test]
fn link_restaurant_fails_without_mutation_when_city_is_missing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let giralda = restaurants
        .create_restaurant("La Giralda", None, madrid.id)
        .unwrap();

    let missing = Uuid::new_v4();
    let err = relations.link_restaurant(missing, giralda.id).unwrap_err();
    assert!(matches!(err, RelationError::CityNotFound(id) if id == missing));
}

#[test]
fn link_restaurant_fails_when_restaurant_is_missing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();

    let missing = Uuid::new_v4();
    let err = relations.link_restaurant(madrid.id, missing).unwrap_err();
    assert!(matches!(err, RelationError::RestaurantNotFound(id) if id == missing));

    let reloaded = cities.get_city(madrid.id).unwrap().unwrap();
    assert!(reloaded.restaurants.is_empty());
}

#[test]
fn unlink_of_an_already_unlinked_pair_is_a_noop() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let giralda = restaurants
        .create_restaurant("La Giralda", None, madrid.id)
        .unwrap();

    let city = relations.unlink_restaurant(madrid.id, giralda.id).unwrap();
    assert!(city.restaurants.is_empty());
}

#[test]
fn completed_operations_preserve_the_reference_invariant() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let milano = cities.create_city("Milano", "Italy").unwrap();

    let mut linked: Vec<(DocId, DocId)> = Vec::new();
    for (name, city_id) in [
        ("La Giralda", madrid.id),
        ("La Rambla", madrid.id),
        ("Pizza di la mama", milano.id),
    ] {
        let restaurant = restaurants.create_restaurant(name, None, city_id).unwrap();
        relations.link_restaurant(city_id, restaurant.id).unwrap();
        linked.push((city_id, restaurant.id));
    }

    relations.delete_restaurant(linked[1].1).unwrap();

    for restaurant in restaurants.list_restaurants().unwrap() {
        let city = cities.get_city(restaurant.city).unwrap().unwrap();
        assert!(
            city.references(restaurant.id),
            "restaurant {} missing from city {} reference set",
            restaurant.id,
            city.id
        );
    }
}

#[test]
fn cascade_delete_removes_city_and_all_its_restaurants() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let milano = cities.create_city("Milano", "Italy").unwrap();
    for name in ["La Giralda", "La Rambla"] {
        let restaurant = restaurants.create_restaurant(name, None, madrid.id).unwrap();
        relations.link_restaurant(madrid.id, restaurant.id).unwrap();
    }
    let mama = restaurants
        .create_restaurant("Pizza di la mama", None, milano.id)
        .unwrap();
    relations.link_restaurant(milano.id, mama.id).unwrap();

    let removed = relations.delete_city_cascade(madrid.id).unwrap();
    assert_eq!(removed, 2);

    assert!(restaurants.find_by_city(madrid.id).unwrap().is_empty());
    assert!(cities.get_city(madrid.id).unwrap().is_none());

    // Unrelated city and restaurant survive untouched.
    let milano_after = cities.get_city(milano.id).unwrap().unwrap();
    assert!(milano_after.references(mama.id));
}

#[test]
fn cascade_delete_of_missing_city_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let relations = RelationService::new(&store);

    let missing = Uuid::new_v4();
    let err = relations.delete_city_cascade(missing).unwrap_err();
    assert!(matches!(err, RelationError::CityNotFound(id) if id == missing));
}

#[test]
fn delete_restaurant_unlinks_it_from_its_city() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let giralda = restaurants
        .create_restaurant("La Giralda", None, madrid.id)
        .unwrap();
    relations.link_restaurant(madrid.id, giralda.id).unwrap();

    relations.delete_restaurant(giralda.id).unwrap();

    assert!(restaurants.get_restaurant(giralda.id).unwrap().is_none());
    let reloaded = cities.get_city(madrid.id).unwrap().unwrap();
    assert!(!reloaded.references(giralda.id));
}

#[test]
fn integrity_check_reports_exactly_the_dangling_restaurant() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let giralda = restaurants
        .create_restaurant("La Giralda", None, madrid.id)
        .unwrap();
    relations.link_restaurant(madrid.id, giralda.id).unwrap();

    // Out-of-band edit: a restaurant pointing at a city that was deleted
    // behind the service's back.
    let ghost_city = Uuid::new_v4();
    let dangling = store
        .create(
            RESTAURANTS,
            json!({"name": "Ghost Diner", "address": null, "city": ghost_city.to_string()}),
        )
        .unwrap();

    let err = relations.verify_integrity().unwrap_err();
    match err {
        RelationError::ReferentialIntegrity(violations) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].restaurant, dangling);
            assert_eq!(violations[0].missing_city, ghost_city);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn restaurant_with_city_resolves_the_owning_city() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let giralda = restaurants
        .create_restaurant("La Giralda", Some("Calle Betis"), madrid.id)
        .unwrap();

    let (restaurant, city) = relations.restaurant_with_city(giralda.id).unwrap();
    assert_eq!(restaurant.name, "La Giralda");
    assert_eq!(city.name, "Madrid");
    assert_eq!(city.country, "Spain");
}

// Same store, transactional capability masked: the cascade must still apply
// restaurant deletions before the city deletion.
struct PlainStore<'conn>(SqliteDocumentStore<'conn>);

impl DocumentStore for PlainStore<'_> {
    fn create(&self, collection: &str, body: Value) -> StoreResult<DocId> {
        self.0.create(collection, body)
    }

    fn find_by_id(&self, collection: &str, id: DocId) -> StoreResult<Option<Value>> {
        self.0.find_by_id(collection, id)
    }

    fn find_many(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.0.find_many(collection, filter)
    }

    fn update_by_id(&self, collection: &str, id: DocId, patch: &Patch) -> StoreResult<Value> {
        self.0.update_by_id(collection, id, patch)
    }

    fn delete_by_id(&self, collection: &str, id: DocId) -> StoreResult<bool> {
        self.0.delete_by_id(collection, id)
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<usize> {
        self.0.delete_many(collection, filter)
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Value>> {
        self.0.aggregate(collection, pipeline)
    }
}

#[test]
fn cascade_works_without_scoped_transactions() {
    let conn = open_db_in_memory().unwrap();
    let store = PlainStore(SqliteDocumentStore::try_new(&conn).unwrap());
    assert!(!store.supports_scoped_transactions());

    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let milano = cities.create_city("Milano", "Italy").unwrap();
    let mama = restaurants
        .create_restaurant("Pizza di la mama", None, milano.id)
        .unwrap();
    relations.link_restaurant(milano.id, mama.id).unwrap();

    let removed = relations.delete_city_cascade(milano.id).unwrap();
    assert_eq!(removed, 1);
    assert!(cities.get_city(milano.id).unwrap().is_none());
    assert!(restaurants.find_by_city(milano.id).unwrap().is_empty());
}
