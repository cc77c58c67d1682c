// 🐾 Interaction loop - numbered menus over any reader / writer
//
// `exit` anywhere ends the session, `back` leaves a submenu, `debug` dumps
// the current state to the log (development only). Bad input re-prompts;
// a failed database call ends the current action, not the session.

use crate::config::Config;
use crate::entities::{Dog, NewDog, Walk};
use crate::error::{Error, Result};
use crate::repository::DogRepository;
use crate::temporal;
use chrono::NaiveDateTime;
use crossterm::style::Stylize;
use rusqlite::Connection;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Line(String),
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
enum Pick<T> {
    Picked(T),
    Back,
    Exit,
}

/// Read a line or leave the current handler with `Flow::Exit`
macro_rules! read_or_exit {
    ($cli:expr) => {
        match $cli.ask()? {
            Input::Line(line) => line,
            Input::Exit => return Ok(Flow::Exit),
        }
    };
}

/// Unwrap a pick, leaving on `back` / `exit`
macro_rules! picked_or_return {
    ($pick:expr) => {
        match $pick {
            Pick::Picked(value) => value,
            Pick::Back => return Ok(Flow::Continue),
            Pick::Exit => return Ok(Flow::Exit),
        }
    };
}

/// 1-based menu number → 0-based index
pub fn parse_selection(input: &str, len: usize) -> Result<usize> {
    let number: usize = input
        .trim()
        .parse()
        .map_err(|e| Error::parse("selection", input, e))?;

    if number == 0 || number > len {
        return Err(Error::not_found("selection", number));
    }
    Ok(number - 1)
}

/// `1, 3 4` → `[0, 2, 3]`, duplicates removed, order kept
pub fn parse_multi_selection(input: &str, len: usize) -> Result<Vec<usize>> {
    let mut picks = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.is_empty() {
            continue;
        }
        let index = parse_selection(part, len)?;
        if !picks.contains(&index) {
            picks.push(index);
        }
    }

    if picks.is_empty() {
        return Err(Error::validation("selection", "choose at least one number"));
    }
    Ok(picks)
}

pub struct DogWalkerCli<'c, R, W> {
    repo: DogRepository<'c>,
    config: &'c Config,
    input: R,
    output: W,
    clock: fn() -> NaiveDateTime,
}

impl<'c, R: BufRead, W: Write> DogWalkerCli<'c, R, W> {
    pub fn new(conn: &'c Connection, config: &'c Config, input: R, output: W) -> Self {
        DogWalkerCli {
            repo: DogRepository::new(conn),
            config,
            input,
            output,
            clock: temporal::now_local,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn run(&mut self) -> Result<()> {
        self.say(&"Hi there! Welcome to the Dog Walker CLI!".cyan().to_string())?;

        loop {
            self.print_main_menu()?;
            let choice = match self.ask()? {
                Input::Line(line) => line,
                Input::Exit => break,
            };

            match self.handle_choice(&choice) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(err) => self.report(err)?,
            }
        }

        self.say(&"Thanks for using the Dog Walker CLI!".green().to_string())
    }

    // ========================================================================
    // I/O
    // ========================================================================

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    fn prompt(&mut self, question: &str) -> Result<()> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;
        Ok(())
    }

    fn ask(&mut self) -> Result<Input> {
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Input::Exit);
        }

        let line = line.trim();
        if line == "exit" {
            return Ok(Input::Exit);
        }
        Ok(Input::Line(line.to_string()))
    }

    fn whoops(&mut self, message: &str) -> Result<()> {
        self.say(&format!("Whoops! {}", message).red().to_string())
    }

    fn report(&mut self, err: Error) -> Result<()> {
        if err.is_input_error() {
            tracing::warn!(error = %err, "rejected input");
            self.whoops(&err.to_string())
        } else {
            tracing::error!(error = %err, "action failed");
            self.say(&format!("Something went wrong: {}", err).red().to_string())
        }
    }

    fn print_dog(&mut self, dog: &Dog) -> Result<()> {
        let summary = dog.render_summary(&self.config.freshness, self.now());
        self.say("")?;
        self.say(&summary)?;
        self.say("")
    }

    // ========================================================================
    // MENUS
    // ========================================================================

    fn print_main_menu(&mut self) -> Result<()> {
        let lines = [
            "What would you like to do? Type the number that matches your choice or 'exit' to leave the program",
            "Here's a list of the options. Type:",
            "  1. To add a dog",
            "  2. To view Dog Info",
            "  3. To add a walk",
            "  4. To view Walk info",
            "  exit to leave the program",
        ];
        for line in lines {
            self.say(&line.cyan().to_string())?;
        }
        Ok(())
    }

    fn print_dog_menu(&mut self) -> Result<()> {
        self.say("Dogs Submenu: What would you like to do?")?;
        let lines = [
            "  1. To feed a dog",
            "  2. To walk a dog",
            "  3. To view all dogs who need feeding",
            "  4. To view all dogs who need walking",
            "  5. To view all walks for a particular dog",
            "  6. To view all feedings for a particular dog",
            "  back to return to the main menu",
            "  exit to leave the program",
        ];
        for line in lines {
            self.say(&line.cyan().to_string())?;
        }
        Ok(())
    }

    pub fn handle_choice(&mut self, choice: &str) -> Result<Flow> {
        match choice {
            "1" => self.add_dog(),
            "2" => self.dog_info(),
            "3" => self.create_walk(),
            "4" => self.walk_info(),
            "debug" => self.debug(),
            _ => {
                self.whoops("I didn't understand your choice")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dog_info(&mut self) -> Result<Flow> {
        self.list_dog_names()?;

        loop {
            self.print_dog_menu()?;
            let input = read_or_exit!(self);

            let result = match input.as_str() {
                "back" => return Ok(Flow::Continue),
                "1" => self.feed_dog(),
                "2" => self.walk_dog(),
                "3" => self.list_dogs_who_need_feeding(),
                "4" => self.list_dogs_who_need_walking(),
                "5" => self.list_walks_for_dog(),
                "6" => self.list_feedings_for_dog(),
                _ => {
                    self.whoops("I didn't understand your choice")?;
                    Ok(Flow::Continue)
                }
            };

            match result {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return Ok(Flow::Exit),
                Err(err) => self.report(err)?,
            }
        }
    }

    // ========================================================================
    // DOGS
    // ========================================================================

    fn list_dog_names(&mut self) -> Result<()> {
        let dogs = self.repo.find_all()?;
        self.say("Dogs: ")?;
        for dog in dogs {
            self.say(&dog.name)?;
        }
        Ok(())
    }

    /// Ask until the answer parses, leaving on `exit`
    fn ask_until<T, F>(&mut self, question: &str, parse: F) -> Result<Option<T>>
    where
        F: Fn(&str) -> Result<T>,
    {
        loop {
            self.prompt(question)?;
            let line = match self.ask()? {
                Input::Line(line) => line,
                Input::Exit => return Ok(None),
            };

            match parse(&line) {
                Ok(value) => return Ok(Some(value)),
                Err(err) if err.is_input_error() => {
                    tracing::warn!(error = %err, "re-prompting");
                    self.whoops(&err.to_string())?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn add_dog(&mut self) -> Result<Flow> {
        let Some(name) = self.ask_until("What's the dog's name?", |line| {
            if line.trim().is_empty() {
                Err(Error::validation("name", "a dog needs a name"))
            } else {
                Ok(line.to_string())
            }
        })?
        else {
            return Ok(Flow::Exit);
        };

        let Some(birthdate) = self.ask_until("What's the dog's birthday? (YYYY-MM-DD)", |line| {
            temporal::parse_date_input(line).map(|_| line.to_string())
        })?
        else {
            return Ok(Flow::Exit);
        };

        self.prompt("What's the dog's breed?")?;
        let breed = read_or_exit!(self);
        self.prompt("What's the dog's image url?")?;
        let image_url = read_or_exit!(self);
        self.prompt("Any favorite treats? (comma separated, blank for none)")?;
        let treats = read_or_exit!(self);

        let mut attrs = NewDog::new(&name, &birthdate, &breed, &image_url);
        attrs.favorite_treats = treats
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let dog = self.repo.create(attrs)?;
        self.print_dog(&dog)?;
        Ok(Flow::Continue)
    }

    fn choose_dog(&mut self, dogs: &[Dog]) -> Result<Pick<Dog>> {
        if dogs.is_empty() {
            self.say("There are no dogs yet. Add one from the main menu!")?;
            return Ok(Pick::Back);
        }

        loop {
            for (index, dog) in dogs.iter().enumerate() {
                self.say(&format!("{}. {} ({})", index + 1, dog.name, dog.breed))?;
            }
            self.say("Type the number associated with the dog you'd like to choose, or 'back'")?;

            let line = match self.ask()? {
                Input::Line(line) => line,
                Input::Exit => return Ok(Pick::Exit),
            };
            if line == "back" {
                return Ok(Pick::Back);
            }

            match parse_selection(&line, dogs.len()) {
                Ok(index) => return Ok(Pick::Picked(dogs[index].clone())),
                Err(err) => {
                    tracing::warn!(error = %err, "re-prompting for a dog");
                    self.whoops("We couldn't find a dog matching your choice.")?;
                    self.say("Please try again")?;
                }
            }
        }
    }

    fn feed_dog(&mut self) -> Result<Flow> {
        self.say("Pick the number matching the dog you'd like to feed")?;
        let dogs = self.repo.find_all()?;
        let mut dog = picked_or_return!(self.choose_dog(&dogs)?);

        let now = self.now();
        self.repo.record_feeding(&mut dog, now)?;
        self.print_dog(&dog)?;
        Ok(Flow::Continue)
    }

    fn walk_dog(&mut self) -> Result<Flow> {
        self.say("Pick the number matching the dog you'd like to walk")?;
        let dogs = self.repo.find_all()?;
        let mut dog = picked_or_return!(self.choose_dog(&dogs)?);

        let now = self.now();
        self.repo.record_walk(&mut dog, now)?;
        self.print_dog(&dog)?;
        Ok(Flow::Continue)
    }

    fn list_dogs_who_need_feeding(&mut self) -> Result<Flow> {
        self.say(&"Dogs who need feeding:".green().to_string())?;
        let now = self.now();
        let dogs = self.repo.hungry(&self.config.freshness, now)?;

        if dogs.is_empty() {
            self.say("All dogs are fed!")?;
        }
        for dog in &dogs {
            self.print_dog(dog)?;
        }
        Ok(Flow::Continue)
    }

    fn list_dogs_who_need_walking(&mut self) -> Result<Flow> {
        self.say(&"Dogs who need walking:".green().to_string())?;
        let now = self.now();
        let dogs = self.repo.needs_walking(&self.config.freshness, now)?;

        if dogs.is_empty() {
            self.say("All dogs are walked!")?;
        }
        for dog in &dogs {
            self.print_dog(dog)?;
        }
        Ok(Flow::Continue)
    }

    fn list_walks_for_dog(&mut self) -> Result<Flow> {
        self.say("Which dog do you want to view past walks for?")?;
        let dogs = self.repo.find_all()?;
        let dog = picked_or_return!(self.choose_dog(&dogs)?);

        self.say(&format!("Recent walks for {}:", dog.name))?;
        for walk in self.repo.walks_for(&dog)? {
            self.say(&format!("time: {}", walk.formatted_time()))?;
        }
        Ok(Flow::Continue)
    }

    fn list_feedings_for_dog(&mut self) -> Result<Flow> {
        self.say("Which dog do you want to view past feedings for?")?;
        let dogs = self.repo.find_all()?;
        let dog = picked_or_return!(self.choose_dog(&dogs)?);

        self.say(&format!("Recent feedings for {}:", dog.name))?;
        for feeding in self.repo.feedings_for(&dog)? {
            self.say(&format!("time: {}", feeding.formatted_time()))?;
        }
        Ok(Flow::Continue)
    }

    // ========================================================================
    // WALKS
    // ========================================================================

    fn print_walk(&mut self, walk: &Walk) -> Result<()> {
        let names = self.repo.dog_names_for(walk)?;
        self.say("")?;
        self.say(&walk.render(&names))?;
        self.say("")
    }

    fn create_walk(&mut self) -> Result<Flow> {
        let dogs = self.repo.find_all()?;
        if dogs.is_empty() {
            self.say("There are no dogs yet. Add one from the main menu!")?;
            return Ok(Flow::Continue);
        }

        for (index, dog) in dogs.iter().enumerate() {
            self.say(&format!("{}. {} ({})", index + 1, dog.name, dog.breed))?;
        }

        let count = dogs.len();
        let question = "Which dogs would you like to take on the walk? (numbers separated by commas)";
        let Some(picks) = self.ask_until(question, |line| parse_multi_selection(line, count))? else {
            return Ok(Flow::Exit);
        };

        let dog_ids: Vec<i64> = picks.iter().filter_map(|&i| dogs[i].id()).collect();
        let now = self.now();
        let walk = self.repo.create_walk(&dog_ids, now)?;
        self.print_walk(&walk)?;
        Ok(Flow::Continue)
    }

    fn walk_info(&mut self) -> Result<Flow> {
        let walks = self.repo.walks()?;
        if walks.is_empty() {
            self.say("No walks yet!")?;
            return Ok(Flow::Continue);
        }

        loop {
            self.say("Which walk would you like to choose?")?;
            for (index, walk) in walks.iter().enumerate() {
                self.say(&format!("{}. {}", index + 1, walk.formatted_time()))?;
            }
            self.say("Type the number of the walk, or 'back'")?;

            let line = read_or_exit!(self);
            if line == "back" {
                return Ok(Flow::Continue);
            }

            match parse_selection(&line, walks.len()) {
                Ok(index) => {
                    self.print_walk(&walks[index])?;
                    return Ok(Flow::Continue);
                }
                Err(err) => self.report(err)?,
            }
        }
    }

    // ========================================================================
    // DEBUG HOOK
    // ========================================================================

    fn debug(&mut self) -> Result<Flow> {
        if !self.config.environment.is_development() {
            self.say("Debug mode is only available in development.")?;
            return Ok(Flow::Continue);
        }

        let dogs = self.repo.find_all()?;
        let walks = self.repo.walks()?;
        let snapshot = serde_json::json!({
            "environment": self.config.environment.as_str(),
            "cached": self.repo.is_cached(),
            "dogs": dogs,
            "walks": walks,
        });

        tracing::debug!(snapshot = %serde_json::to_string_pretty(&snapshot)?, "debug snapshot");
        self.say(&format!(
            "Debug snapshot of {} dogs and {} walks written to the log.",
            dogs.len(),
            walks.len()
        ))?;
        Ok(Flow::Continue)
    }
}
