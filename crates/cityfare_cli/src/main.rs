//! Demonstration walkthrough of the city/restaurant relationship layer.
//!
//! # Responsibility
//! - Replay the full lifecycle against an in-memory database: seed, link,
//!   report, cascade delete, wipe.
//! - Keep output deterministic for quick local sanity checks.

use cityfare_core::db::open_db_in_memory;
use cityfare_core::{
    restaurant_counts_by_city, CityRepo, RelationService, RestaurantRepo, SqliteDocumentStore,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory()?;
    let store = SqliteDocumentStore::try_new(&conn)?;
    let cities = CityRepo::new(&store);
    let restaurants = RestaurantRepo::new(&store);
    let relations = RelationService::new(&store);

    // Seed cities.
    let madrid = cities.create_city("Madrid", "Spain")?;
    let barcelona = cities.create_city("Barcelona", "Spain")?;
    let milano = cities.create_city("Milano", "Italy")?;
    for city in [&madrid, &barcelona, &milano] {
        println!("city created: {} ({})", city.name, city.country);
    }

    // Seed restaurants and link them explicitly to their cities.
    let giralda = restaurants.create_restaurant("La Giralda", Some("Calle Betis"), madrid.id)?;
    let rambla = restaurants.create_restaurant("La Rambla", Some("La Rambla 45"), madrid.id)?;
    relations.link_restaurant(madrid.id, giralda.id)?;
    relations.link_restaurant(madrid.id, rambla.id)?;

    let mama = restaurants.create_restaurant("Pizza di la mama", Some("Calle Macarroni"), milano.id)?;
    relations.link_restaurant(milano.id, mama.id)?;

    // Read a restaurant together with its owning city.
    let (restaurant, city) = relations.restaurant_with_city(giralda.id)?;
    println!(
        "restaurant `{}` belongs to {} ({})",
        restaurant.name, city.name, city.country
    );

    // Derived report: restaurant counts per city, joined with attributes.
    let mut counts = restaurant_counts_by_city(&store)?;
    counts.sort_by(|a, b| a.city_name.cmp(&b.city_name));
    for row in &counts {
        println!(
            "report: {} ({}) -> {} restaurants",
            row.city_name, row.country, row.total_restaurants
        );
    }

    // Consistency check before any deletion.
    relations.verify_integrity()?;

    // Cascade: dropping Milano removes its restaurants first.
    let removed = relations.delete_city_cascade(milano.id)?;
    println!("cascade deleted Milano and {removed} restaurant(s)");

    // Unlink and delete a single restaurant.
    relations.delete_restaurant(rambla.id)?;
    println!("deleted restaurant `La Rambla`");

    // Wipe down: all restaurants, then all cities.
    let restaurants_removed = restaurants.delete_all_restaurants()?;
    let cities_removed = cities.delete_all_cities()?;
    println!("wiped {restaurants_removed} restaurant(s) and {cities_removed} city/cities");

    let empty = restaurant_counts_by_city(&store)?;
    println!("report rows after wipe: {}", empty.len());

    Ok(())
}
