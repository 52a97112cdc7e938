use recmold::prelude::*;
use recmold::{MemoryEntity, key_values};

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_model(
            "Team",
            ModelSchema::new(["id"], ["name", "headquarters"]).many("heroes"),
        )
        .with_model(
            "Hero",
            ModelSchema::new(["id"], ["name", "secretName", "age"]).one("team"),
        )
}

fn registry() -> StaticRegistry {
    StaticRegistry::new().with_model(
        ModelInfo::new("Hero", ["id"])
            .relationship(RelationshipInfo::new("team", "Team", ["teamId"], ["id"]).unwrap()),
    )
}

fn seed(store: &MemoryStore) -> (MemoryEntity, Vec<MemoryEntity>) {
    let team = store
        .insert(
            "Team",
            [
                ("id", Value::BigInt(1)),
                ("name", Value::from("Preventers")),
                ("headquarters", Value::from("Sharp Tower")),
            ],
        )
        .unwrap();
    let mut heroes = Vec::new();
    for (id, name, secret) in [(1, "Rusty-Man", "Tommy Sharp"), (2, "Spider-Boy", "Pedro")] {
        let mut hero = store
            .insert(
                "Hero",
                [
                    ("id", Value::BigInt(id)),
                    ("name", Value::from(name)),
                    ("secretName", Value::from(secret)),
                    ("age", Value::Int(30)),
                ],
            )
            .unwrap();
        store
            .set_relationship(&mut hero, "team", Some(team.clone()))
            .unwrap();
        heroes.push(hero);
    }
    store.set_many(&team, "heroes", Some(heroes.clone())).unwrap();
    (team, heroes)
}

#[test]
fn projected_record_applies_back_unchanged() {
    let store = store();
    let registry = registry();
    let (_, heroes) = seed(&store);
    let projector = GraphProjector::new(&store, &registry);
    let molds = MoldMap::single(
        Mold::of(["id", "name", "secretName", "age", "teamId"], ["id"]).unwrap(),
    );

    let mut hero = heroes[0].clone();
    let before = projector.project(&hero, &molds).unwrap();
    projector.update(&mut hero, &before).unwrap();
    let after = projector.project(&hero, &molds).unwrap();
    assert_eq!(before, after);
    assert_eq!(key_values(&after).unwrap(), vec![Value::BigInt(1)]);
}

#[test]
fn team_with_heroes_is_bounded_by_molds() {
    let store = store();
    let registry = registry();
    let (team, _) = seed(&store);
    let projector = GraphProjector::new(&store, &registry);

    // heroes.team has no mold, so the cycle back to the team is not followed.
    let molds = MoldMap::new()
        .with(ROOT_PATH, Mold::of(["id", "name", "heroes"], ["id"]).unwrap())
        .with(
            "heroes",
            Mold::of(["id", "name", "team", "teamId"], ["id"]).unwrap(),
        );
    let record = projector.project(&team, &molds).unwrap();

    let heroes = record.get("heroes").unwrap();
    let heroes = heroes.as_array().unwrap();
    assert_eq!(heroes.len(), 2);
    for item in heroes {
        let hero = item.as_record().unwrap();
        assert_eq!(hero.get("team").unwrap(), Value::Null);
        assert_eq!(hero.get("teamId").unwrap(), Value::BigInt(1));
    }
    assert!(!record.property_names().contains("headquarters"));
    assert!(record.get("headquarters").unwrap_err().is_undeclared());
}

#[test]
fn foreign_key_moves_hero_between_teams() {
    let store = store();
    let registry = registry();
    let (_, heroes) = seed(&store);
    let other = store
        .insert(
            "Team",
            [("id", Value::BigInt(2)), ("name", Value::from("Z-Force"))],
        )
        .unwrap();
    let projector = GraphProjector::new(&store, &registry);
    let molds = MoldMap::new()
        .with(ROOT_PATH, Mold::of(["id", "teamId", "team"], ["id"]).unwrap())
        .with("team", Mold::of(["id", "name"], ["id"]).unwrap());

    let mut hero = heroes[1].clone();
    let mut record = projector.project(&hero, &molds).unwrap();
    record.set("teamId", Value::BigInt(2)).unwrap();
    projector.update(&mut hero, &record).unwrap();

    assert_eq!(store.get_relationship(&hero, "team").unwrap(), Some(other));
    let reread = projector.project(&hero, &molds).unwrap();
    let team = reread.get("team").unwrap();
    assert_eq!(
        team.as_record().unwrap().get("name").unwrap(),
        Value::from("Z-Force")
    );
}

#[test]
fn records_survive_json() {
    let store = store();
    let registry = registry();
    let (team, _) = seed(&store);
    let projector = GraphProjector::new(&store, &registry);
    let molds = MoldMap::single(Mold::of(["id", "name"], ["id"]).unwrap());

    let record = projector.project(&team, &molds).unwrap();
    let json = serde_json::to_string(&record).unwrap();
    let back: TransferRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.get("name").unwrap(), Value::from("Preventers"));
    assert_eq!(back.key_property_names(), record.key_property_names());
}

#[test]
fn create_through_factory_closure() {
    let store = store();
    let registry = registry();
    seed(&store);
    let projector = GraphProjector::new(&store, &registry);

    let mut record =
        TransferRecord::with_properties(["id", "name", "age", "teamId"], ["id"]).unwrap();
    record.set("name", Value::from("Captain North America")).unwrap();
    record.set("age", Value::Int(93)).unwrap();
    record.set("teamId", Value::BigInt(1)).unwrap();

    let mut factory = |_: &TransferRecord| -> Result<MemoryEntity> {
        store.insert("Hero", [("id", Value::BigInt(7))])
    };
    let echo = projector.create(&mut factory, &record).unwrap();
    assert_eq!(echo.get("id").unwrap(), Value::BigInt(7));
    assert_eq!(echo.get("age").unwrap(), Value::Int(93));
    assert_eq!(echo.get("teamId").unwrap(), Value::BigInt(1));
}
