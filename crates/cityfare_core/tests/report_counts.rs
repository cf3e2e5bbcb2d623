use cityfare_core::db::open_db_in_memory;
use cityfare_core::{
    restaurant_counts_by_city, CityRepo, DocumentStore, RelationService, RestaurantRepo,
    SqliteDocumentStore, CITIES,
};

#[test]
fn counts_join_city_attributes_and_omit_empty_cities() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    cities.create_city("Barcelona", "Spain").unwrap();
    let milano = cities.create_city("Milano", "Italy").unwrap();

    for (name, address, city_id) in [
        ("La Giralda", Some("Calle Betis"), madrid.id),
        ("La Rambla", Some("La Rambla 45"), madrid.id),
        ("Pizza di la mama", Some("Calle Macarroni"), milano.id),
    ] {
        let restaurant = restaurants.create_restaurant(name, address, city_id).unwrap();
        relations.link_restaurant(city_id, restaurant.id).unwrap();
    }

    let mut counts = restaurant_counts_by_city(&store).unwrap();
    counts.sort_by(|a, b| a.city_name.cmp(&b.city_name));

    assert_eq!(counts.len(), 2, "Barcelona has no restaurants and must be omitted");

    assert_eq!(counts[0].city_name, "Madrid");
    assert_eq!(counts[0].country, "Spain");
    assert_eq!(counts[0].total_restaurants, 2);

    assert_eq!(counts[1].city_name, "Milano");
    assert_eq!(counts[1].country, "Italy");
    assert_eq!(counts[1].total_restaurants, 1);
}

#[test]
fn report_is_empty_when_there_are_no_restaurants() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);

    cities.create_city("Madrid", "Spain").unwrap();

    let counts = restaurant_counts_by_city(&store).unwrap();
    assert!(counts.is_empty());
}

#[test]
fn rows_whose_city_vanished_are_dropped() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    let madrid = cities.create_city("Madrid", "Spain").unwrap();
    let milano = cities.create_city("Milano", "Italy").unwrap();
    for (name, city_id) in [("La Giralda", madrid.id), ("Pizza di la mama", milano.id)] {
        let restaurant = restaurants.create_restaurant(name, None, city_id).unwrap();
        relations.link_restaurant(city_id, restaurant.id).unwrap();
    }

    // Out-of-band removal of the city record: its restaurants still exist,
    // so the group survives but the join finds nothing to attach.
    store.delete_by_id(CITIES, milano.id).unwrap();

    let counts = restaurant_counts_by_city(&store).unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].city_name, "Madrid");
}

#[test]
fn wiping_both_collections_leaves_an_empty_report() {
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

    assert_eq!(restaurants.delete_all_restaurants().unwrap(), 1);
    assert_eq!(cities.delete_all_cities().unwrap(), 1);

    assert!(restaurants.list_restaurants().unwrap().is_empty());
    assert!(cities.list_cities().unwrap().is_empty());
    assert!(restaurant_counts_by_city(&store).unwrap().is_empty());
}
