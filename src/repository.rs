// 🗄️ Dog Repository - dogs, walks and feedings in SQLite
//
// The repository owns a "load once" cache of every dog. Writes made through
// the repository keep that cache coherent (create appends, save replaces,
// walks / feedings refresh the derived times). Writes made through any other
// connection are invisible until `invalidate()` is called.

use crate::db::{optional_timestamp_column, timestamp_column, treats_column};
use crate::entities::{Dog, Feeding, NewDog, Walk};
use crate::error::{Error, Result};
use crate::freshness::FreshnessPolicy;
use crate::temporal;
use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

const SELECT_DOGS: &str = "SELECT d.id, d.name, d.birthdate, d.breed, d.image_url, d.favorite_treats,
        (SELECT MAX(w.time) FROM walks w
            JOIN dog_walks dw ON dw.walk_id = w.id
            WHERE dw.dog_id = d.id) AS last_walked_at,
        (SELECT MAX(f.time) FROM feedings f WHERE f.dog_id = d.id) AS last_fed_at
     FROM dogs d";

fn dog_from_row(row: &Row) -> rusqlite::Result<Dog> {
    Ok(Dog::hydrate(
        row.get(0)?,
        row.get(1)?,
        timestamp_column(row, 2)?,
        row.get(3)?,
        row.get(4)?,
        treats_column(row, 5)?,
        optional_timestamp_column(row, 6)?,
        optional_timestamp_column(row, 7)?,
    ))
}

fn feeding_from_row(row: &Row) -> rusqlite::Result<Feeding> {
    Ok(Feeding {
        id: row.get(0)?,
        dog_id: row.get(1)?,
        time: timestamp_column(row, 2)?,
    })
}

fn require_id(dog: &Dog) -> Result<i64> {
    dog.id()
        .ok_or_else(|| Error::validation("dog", format!("{} has not been saved yet", dog.name)))
}

pub struct DogRepository<'c> {
    conn: &'c Connection,
    cache: Option<Vec<Dog>>,
}

impl<'c> DogRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        DogRepository { conn, cache: None }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Forget the cached dogs; the next `find_all` queries again
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    // ========================================================================
    // DOGS
    // ========================================================================

    /// Every dog, ordered by id. Queried once, then served from the cache.
    pub fn find_all(&mut self) -> Result<Vec<Dog>> {
        if let Some(dogs) = &self.cache {
            return Ok(dogs.clone());
        }

        let mut stmt = self.conn.prepare(&format!("{} ORDER BY d.id", SELECT_DOGS))?;
        let dogs = stmt
            .query_map([], dog_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(count = dogs.len(), "loaded dogs");
        self.cache = Some(dogs.clone());
        Ok(dogs)
    }

    /// Look one dog up by id, always from the database
    pub fn find(&self, id: i64) -> Result<Dog> {
        self.conn
            .query_row(
                &format!("{} WHERE d.id = ?1", SELECT_DOGS),
                params![id],
                dog_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("dog", id))
    }

    /// Validate the attributes, insert a row, return the stored dog
    pub fn create(&mut self, attrs: NewDog) -> Result<Dog> {
        let mut dog = attrs.build()?;
        self.save(&mut dog)?;
        Ok(dog)
    }

    /// Insert a dog without an id, otherwise update every stored field by id
    pub fn save(&mut self, dog: &mut Dog) -> Result<()> {
        let treats = serde_json::to_string(&dog.favorite_treats)?;
        let birthdate = temporal::format_timestamp(dog.birthdate);

        match dog.id() {
            None => {
                self.conn.execute(
                    "INSERT INTO dogs (name, birthdate, breed, image_url, favorite_treats)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![dog.name, birthdate, dog.breed, dog.image_url, treats],
                )?;
                dog.assign_id(self.conn.last_insert_rowid());

                tracing::info!(dog_id = dog.id(), name = %dog.name, "dog created");

                if let Some(cache) = &mut self.cache {
                    cache.push(dog.clone());
                }
            }
            Some(id) => {
                let updated = self.conn.execute(
                    "UPDATE dogs
                     SET name = ?1,
                         birthdate = ?2,
                         breed = ?3,
                         image_url = ?4,
                         favorite_treats = ?5
                     WHERE id = ?6",
                    params![dog.name, birthdate, dog.breed, dog.image_url, treats, id],
                )?;

                if updated == 0 {
                    return Err(Error::not_found("dog", id));
                }

                tracing::debug!(dog_id = id, "dog updated");

                // The caller's copy may predate walks / feedings recorded since
                let stored = self.find(id)?;
                dog.refresh_history(stored.last_walked_at(), stored.last_fed_at());

                if let Some(cached) = self.cached_dog_mut(id) {
                    *cached = dog.clone();
                }
            }
        }

        Ok(())
    }

    pub fn hungry(&mut self, policy: &FreshnessPolicy, now: NaiveDateTime) -> Result<Vec<Dog>> {
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|dog| dog.is_hungry(policy, now))
            .collect())
    }

    pub fn needs_walking(&mut self, policy: &FreshnessPolicy, now: NaiveDateTime) -> Result<Vec<Dog>> {
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|dog| dog.needs_walk(policy, now))
            .collect())
    }

    fn ensure_dog_exists(&self, id: i64) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM dogs WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;

        if exists {
            Ok(())
        } else {
            Err(Error::not_found("dog", id))
        }
    }

    fn cached_dog_mut(&mut self, id: i64) -> Option<&mut Dog> {
        self.cache
            .as_mut()
            .and_then(|dogs| dogs.iter_mut().find(|d| d.id() == Some(id)))
    }

    // ========================================================================
    // WALKS (many-to-many)
    // ========================================================================

    /// Take one dog on a walk
    pub fn record_walk(&mut self, dog: &mut Dog, now: NaiveDateTime) -> Result<Walk> {
        let id = require_id(dog)?;
        let walk = self.create_walk(&[id], now)?;
        dog.observe_walk(now);
        Ok(walk)
    }

    /// Take several dogs on the same walk
    pub fn create_walk(&mut self, dog_ids: &[i64], now: NaiveDateTime) -> Result<Walk> {
        if dog_ids.is_empty() {
            return Err(Error::validation("walk", "pick at least one dog"));
        }

        for &id in dog_ids {
            self.ensure_dog_exists(id)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO walks (time) VALUES (?1)",
            params![temporal::format_timestamp(now)],
        )?;
        let walk_id = tx.last_insert_rowid();

        let walk = Walk::new(walk_id, now, dog_ids.to_vec());
        for dog_id in &walk.dog_ids {
            tx.execute(
                "INSERT INTO dog_walks (dog_id, walk_id) VALUES (?1, ?2)",
                params![dog_id, walk_id],
            )?;
        }
        tx.commit()?;

        for &dog_id in &walk.dog_ids {
            if let Some(cached) = self.cached_dog_mut(dog_id) {
                cached.observe_walk(now);
            }
        }

        tracing::info!(walk_id, dogs = ?walk.dog_ids, "walk recorded");
        Ok(walk)
    }

    fn load_walks(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<Walk>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT w.id, w.time, dw.dog_id
             FROM walks w
             LEFT JOIN dog_walks dw ON dw.walk_id = w.id
             {}
             ORDER BY w.time DESC, w.id DESC, dw.dog_id",
            filter
        ))?;

        let rows = stmt
            .query_map(args, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    timestamp_column(row, 1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut walks: Vec<Walk> = Vec::new();
        for (walk_id, time, dog_id) in rows {
            match walks.last_mut() {
                Some(walk) if walk.id == walk_id => walk.dog_ids.extend(dog_id),
                _ => walks.push(Walk::new(walk_id, time, dog_id.into_iter().collect())),
            }
        }

        Ok(walks)
    }

    /// Every walk, newest first
    pub fn walks(&self) -> Result<Vec<Walk>> {
        self.load_walks("", &[])
    }

    /// Walks that started within `window` of `now`, newest first
    pub fn recent_walks(&self, window: Duration, now: NaiveDateTime) -> Result<Vec<Walk>> {
        let from = temporal::format_timestamp(now - window);
        let until = temporal::format_timestamp(now);
        self.load_walks("WHERE w.time >= ?1 AND w.time <= ?2", &[&from as &dyn ToSql, &until])
    }

    /// A dog's walks, newest first
    pub fn walks_for(&self, dog: &Dog) -> Result<Vec<Walk>> {
        let id = require_id(dog)?;
        self.load_walks(
            "WHERE w.id IN (SELECT walk_id FROM dog_walks WHERE dog_id = ?1)",
            &[&id as &dyn ToSql],
        )
    }

    /// Names of the dogs on a walk, ordered by dog id
    pub fn dog_names_for(&self, walk: &Walk) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.name FROM dogs d
             JOIN dog_walks dw ON dw.dog_id = d.id
             WHERE dw.walk_id = ?1
             ORDER BY d.id",
        )?;

        let names = stmt
            .query_map(params![walk.id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(names)
    }

    // ========================================================================
    // FEEDINGS (one-to-many)
    // ========================================================================

    pub fn record_feeding(&mut self, dog: &mut Dog, now: NaiveDateTime) -> Result<Feeding> {
        let dog_id = require_id(dog)?;
        self.ensure_dog_exists(dog_id)?;

        self.conn.execute(
            "INSERT INTO feedings (time, dog_id) VALUES (?1, ?2)",
            params![temporal::format_timestamp(now), dog_id],
        )?;
        let feeding = Feeding {
            id: self.conn.last_insert_rowid(),
            dog_id,
            time: now,
        };

        dog.observe_feeding(now);
        if let Some(cached) = self.cached_dog_mut(dog_id) {
            cached.observe_feeding(now);
        }

        tracing::info!(feeding_id = feeding.id, dog_id, "feeding recorded");
        Ok(feeding)
    }

    /// A dog's feedings, newest first
    pub fn feedings_for(&self, dog: &Dog) -> Result<Vec<Feeding>> {
        let dog_id = require_id(dog)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, dog_id, time FROM feedings
             WHERE dog_id = ?1
             ORDER BY time DESC, id DESC",
        )?;

        let feedings = stmt
            .query_map(params![dog_id], feeding_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(feedings)
    }
}
