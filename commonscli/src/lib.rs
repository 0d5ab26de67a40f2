pub mod logging;

pub use crate::cli::{run, run_with, Cli};

mod cli {
    use anyhow::{Context, Result};
    use clap::Parser;
    use commonswall_core::{
        category_title, CommandRunner, Config, SessionDetector, Status, Transport, WallpaperApp,
    };
    use log::{error, info, warn};
    use rand::Rng;
    use std::io;
    use std::path::PathBuf;

    #[derive(Parser, Debug)]
    #[command(name = "commonscli")]
    #[command(about = "Rotate the desktop wallpaper through images from Wikimedia Commons", long_about = None)]
    #[command(version)]
    pub struct Cli {
        /// Update the page ids in the database from CATEGORY and its subcategories.
        /// AMOUNT is the maximum number of new ids added (default 100).
        #[arg(short = 'f', long, num_args = 1..=2, value_names = ["CATEGORY", "AMOUNT"])]
        pub fetch_ids: Option<Vec<String>>,

        /// Write log messages to stderr as well as the log file
        #[arg(short = 'l', long)]
        pub print_log: bool,

        /// Change to a new desktop image
        #[arg(short = 'n', long)]
        pub new_image: bool,

        /// Open the Wikimedia Commons page of the current image in the default web browser
        #[arg(short = 'i', long)]
        pub information: bool,

        /// Mark the current image as a favorite. Favorites are not deleted when switching image.
        #[arg(short = 'a', long)]
        pub favorite: bool,

        /// Clear the favorite mark of the current image
        #[arg(short = 'u', long)]
        pub unfavorite: bool,

        /// Directory holding images.db, images/ and logs/
        #[arg(long, value_name = "DIR")]
        pub data_dir: Option<PathBuf>,
    }

    impl Cli {
        /// Category title and amount from `--fetch-ids`, if given.
        pub fn fetch_request(&self, default_amount: usize) -> Result<Option<(String, usize)>> {
            let Some(values) = &self.fetch_ids else {
                return Ok(None);
            };
            let category = category_title(&values[0]);
            let amount = match values.get(1) {
                Some(raw) => raw
                    .parse::<usize>()
                    .with_context(|| format!("AMOUNT must be a non-negative integer, got {:?}", raw))?,
                None => default_amount,
            };
            Ok(Some((category, amount)))
        }

        pub fn config(&self) -> Result<Config> {
            match &self.data_dir {
                Some(dir) => Ok(Config::with_root(dir)),
                None => Config::new(),
            }
        }
    }

    pub fn run(cli: Cli) -> Result<()> {
        let config = cli.config()?;
        config.ensure_dirs()?;
        crate::logging::init(&config.log_file, cli.print_log)?;

        let mut app = WallpaperApp::new(config)?;
        run_with(&mut app, &cli, &mut rand::thread_rng(), |url| open::that(url))
    }

    /// Apply the requested actions in order: fetch, new image, information,
    /// favorite, unfavorite. `open_page` shows a URL to the user.
    pub fn run_with<T, S, R, F>(
        app: &mut WallpaperApp<T, S>,
        cli: &Cli,
        rng: &mut R,
        mut open_page: F,
    ) -> Result<()>
    where
        T: Transport,
        S: SessionDetector + CommandRunner,
        R: Rng + ?Sized,
        F: FnMut(&str) -> io::Result<()>,
    {
        if let Some((category, amount)) = cli.fetch_request(app.config().default_fetch_amount)? {
            info!("Fetching up to {} page ids from {}", amount, category);
            app.populate(&category, amount)?;
        }

        if cli.new_image {
            app.change_image(rng)?;
        }

        if cli.information {
            match app.current_page_url()? {
                Some(url) => {
                    info!("Opening {}", url);
                    if let Err(e) = open_page(&url) {
                        error!("Failed to open {}: {}", url, e);
                    }
                }
                None => warn!("No current image to show information for."),
            }
        }

        if cli.favorite {
            app.set_current_status(Status::Favorite)?;
        }

        if cli.unfavorite {
            app.set_current_status(Status::Normal)?;
        }

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use commonswall_core::{BackgroundSetter, CommonsClient, IdStore, PageId};
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use std::cell::RefCell;
        use std::collections::HashMap;
        use std::fs;
        use std::path::Path;
        use tempfile::TempDir;

        /// Serves canned bodies keyed by `cmtitle` or `pageids`.
        #[derive(Default)]
        struct CannedApi {
            bodies: HashMap<String, String>,
        }

        impl Transport for CannedApi {
            fn get_json(&self, params: &[(String, String)]) -> Result<String> {
                let key = params
                    .iter()
                    .find(|(k, _)| k == "cmtitle" || k == "pageids")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                self.bodies
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no canned body for {}", key))
            }

            fn download(&self, _url: &str, dest: &Path) -> Result<()> {
                fs::write(dest, b"image bytes")?;
                Ok(())
            }
        }

        /// A GNOME session that accepts every command.
        #[derive(Default)]
        struct GnomeDesktop {
            commands: RefCell<Vec<String>>,
        }

        impl SessionDetector for GnomeDesktop {
            fn is_running(&self, process_name: &str) -> bool {
                process_name == "gnome-session"
            }
        }

        impl CommandRunner for GnomeDesktop {
            fn run(&self, program: &str, _args: &[String]) -> Result<bool> {
                self.commands.borrow_mut().push(program.to_string());
                Ok(true)
            }
        }

        fn app_with(
            tmp: &TempDir,
            api: CannedApi,
            current: Option<PageId>,
        ) -> WallpaperApp<CannedApi, GnomeDesktop> {
            let config = Config::with_root(tmp.path());
            config.ensure_dirs().unwrap();
            let mut store = IdStore::open_in_memory().unwrap();
            if let Some(id) = current {
                store.insert_if_absent(id).unwrap();
                store.set_current(id).unwrap();
            }
            WallpaperApp::with_parts(
                config,
                store,
                CommonsClient::new(api),
                BackgroundSetter::with_services(GnomeDesktop::default()),
            )
        }

        #[test]
        fn test_actions_run_in_order() {
            let tmp = TempDir::new().unwrap();
            let mut api = CannedApi::default();
            api.bodies.insert(
                "Category:Birds".to_string(),
                r#"{"query":{"categorymembers":[{"pageid":7,"ns":6},{"pageid":8,"ns":6}]}}"#
                    .to_string(),
            );
            api.bodies.insert(
                "7".to_string(),
                r#"{"query":{"pages":{"7":{"pageid":7,"imageinfo":[
                    {"url":"https://upload.wikimedia.org/x/Seven.jpg"}]}}}}"#
                    .to_string(),
            );
            let mut app = app_with(&tmp, api, None);
            let cli = Cli::try_parse_from(["commonscli", "-f", "Birds", "1", "-n", "-i", "-a"])
                .unwrap();

            let mut opened = Vec::new();
            let mut rng = StdRng::seed_from_u64(4);
            run_with(&mut app, &cli, &mut rng, |url| {
                opened.push(url.to_string());
                Ok(())
            })
            .unwrap();

            // the fetched id became current before the page was opened and favorited
            assert_eq!(app.store().all_ids().unwrap(), vec![7]);
            assert_eq!(app.store().get_current().unwrap(), Some(7));
            assert_eq!(opened, vec!["https://commons.wikimedia.org/w/?curid=7"]);
            assert_eq!(app.store().status(7).unwrap(), Some(Status::Favorite));
            assert_eq!(*app.setter().services().commands.borrow(), vec!["gsettings"]);
            assert!(tmp.path().join("images").join("7.jpg").exists());
        }

        #[test]
        fn test_unfavorite_wins_and_open_failure_is_logged() {
            let tmp = TempDir::new().unwrap();
            let mut app = app_with(&tmp, CannedApi::default(), Some(3));
            let cli = Cli::try_parse_from(["commonscli", "-i", "-a", "-u"]).unwrap();

            let mut rng = StdRng::seed_from_u64(4);
            run_with(&mut app, &cli, &mut rng, |_| {
                Err(io::Error::new(io::ErrorKind::NotFound, "no browser"))
            })
            .unwrap();

            assert_eq!(app.store().status(3).unwrap(), Some(Status::Normal));
            assert!(app.setter().services().commands.borrow().is_empty());
        }

        #[test]
        fn test_fetch_ids_with_amount() {
            let cli = Cli::try_parse_from(["commonscli", "--fetch-ids", "Sunsets", "25"]).unwrap();
            assert_eq!(
                cli.fetch_request(100).unwrap(),
                Some(("Category:Sunsets".to_string(), 25))
            );
        }

        #[test]
        fn test_fetch_ids_default_amount() {
            let cli = Cli::try_parse_from(["commonscli", "-f", "Lighthouses", "-n"]).unwrap();
            assert_eq!(
                cli.fetch_request(100).unwrap(),
                Some(("Category:Lighthouses".to_string(), 100))
            );
            assert!(cli.new_image);
        }

        #[test]
        fn test_fetch_ids_bad_amount() {
            let cli = Cli::try_parse_from(["commonscli", "-f", "Birds", "many"]).unwrap();
            assert!(cli.fetch_request(100).is_err());
        }

        #[test]
        fn test_fetch_ids_needs_category() {
            assert!(Cli::try_parse_from(["commonscli", "--fetch-ids"]).is_err());
        }

        #[test]
        fn test_flags_and_data_dir() {
            let cli =
                Cli::try_parse_from(["commonscli", "-l", "-i", "-a", "--data-dir", "/tmp/wall"])
                    .unwrap();
            assert!(cli.print_log && cli.information && cli.favorite);
            assert!(!cli.new_image && !cli.unfavorite);
            assert_eq!(cli.fetch_request(100).unwrap(), None);
            assert_eq!(
                cli.config().unwrap().db_file,
                PathBuf::from("/tmp/wall/images.db")
            );
        }
    }
}
