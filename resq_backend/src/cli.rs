use crate::api;
use crate::auth::{
    resolve_display_name, AuthService, LoginInput, LoginOutcome, RegisterInput, UserView,
};
use crate::config::ResqConfig;
use crate::contacts::ContactsCache;
use crate::events::EventHub;
use crate::feed::FeedPager;
use crate::posts::{Author, CreatePostInput, PostCategory, PostService, PostView};
use crate::store::Store;
use crate::utils::format_millis;
use anyhow::Result;
use shell_words;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Run the HTTP server mode (the default behaviour).
pub async fn run_server(
    config: ResqConfig,
    store: Store,
    events: EventHub,
    contacts: ContactsCache,
) -> Result<()> {
    tracing::info!(port = config.api_port, "starting ResQ backend HTTP server");
    api::serve_http(config, store, events, contacts).await
}

/// Run the interactive CLI used for browsing the feed, posting, and
/// managing the local account.
pub async fn run_cli(store: Store, events: EventHub, contacts: ContactsCache) -> Result<()> {
    let mut session = CliSession {
        auth: AuthService::new(store.clone()),
        posts: PostService::new(store, events),
        contacts,
        pager: FeedPager::new(),
        login: None,
    };

    println!("ResQ CLI ready. Type 'help' for a list of commands.");

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        print!("resq> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            println!("Exiting");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens = match shell_words::split(trimmed) {
            Ok(tokens) if !tokens.is_empty() => tokens,
            Ok(_) => continue,
            Err(err) => {
                println!("Unable to parse command: {err}");
                continue;
            }
        };

        match session.handle_command(&tokens) {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::Exit) => break,
            Err(err) => {
                println!("Error: {err:#}");
            }
        }
    }

    Ok(())
}

struct CliSession {
    auth: AuthService,
    posts: PostService,
    contacts: ContactsCache,
    pager: FeedPager<PostView>,
    login: Option<ActiveLogin>,
}

struct ActiveLogin {
    token: String,
    user: UserView,
}

enum LoopAction {
    Continue,
    Exit,
}

impl CliSession {
    fn handle_command(&mut self, tokens: &[String]) -> Result<LoopAction> {
        let command = tokens[0].as_str();
        match command {
            "help" => {
                self.print_help();
                Ok(LoopAction::Continue)
            }
            "register" => {
                if tokens.len() < 3 {
                    println!("Usage: register <email> <password> [display name]");
                    return Ok(LoopAction::Continue);
                }
                let display_name = if tokens.len() > 3 {
                    Some(tokens[3..].join(" "))
                } else {
                    None
                };
                self.register(tokens[1].clone(), tokens[2].clone(), display_name)?;
                Ok(LoopAction::Continue)
            }
            "login" => {
                if tokens.len() < 3 {
                    println!("Usage: login <email> <password>");
                    return Ok(LoopAction::Continue);
                }
                self.login(tokens[1].clone(), tokens[2].clone())?;
                Ok(LoopAction::Continue)
            }
            "logout" => {
                self.logout()?;
                Ok(LoopAction::Continue)
            }
            "whoami" => {
                self.whoami();
                Ok(LoopAction::Continue)
            }
            "feed" | "refresh" => {
                self.refresh_feed()?;
                Ok(LoopAction::Continue)
            }
            "next" => {
                self.pager.go_to_next_page();
                self.print_page();
                Ok(LoopAction::Continue)
            }
            "prev" => {
                self.pager.go_to_previous_page();
                self.print_page();
                Ok(LoopAction::Continue)
            }
            "page" => {
                let Some(number) = tokens.get(1).and_then(|raw| raw.parse::<usize>().ok()) else {
                    println!("Usage: page <number>");
                    return Ok(LoopAction::Continue);
                };
                self.pager.go_to_page(number);
                self.print_page();
                Ok(LoopAction::Continue)
            }
            "post" => {
                if tokens.len() < 2 {
                    println!("Usage: post \"content\" [category]");
                    return Ok(LoopAction::Continue);
                }
                let content = tokens[1].clone();
                let category = if tokens.len() > 2 {
                    Some(tokens[2..].join(" "))
                } else {
                    None
                };
                self.create_post(content, category)?;
                Ok(LoopAction::Continue)
            }
            "like" => {
                if tokens.len() < 2 {
                    println!("Usage: like <post_id>");
                    return Ok(LoopAction::Continue);
                }
                self.like(&tokens[1])?;
                Ok(LoopAction::Continue)
            }
            "comment" => {
                if tokens.len() < 3 {
                    println!("Usage: comment <post_id> \"text\"");
                    return Ok(LoopAction::Continue);
                }
                let post_id = tokens[1].clone();
                let text = tokens[2..].join(" ");
                self.comment(&post_id, text)?;
                Ok(LoopAction::Continue)
            }
            "contacts" | "hotlines" => {
                let query = if tokens.len() > 1 {
                    Some(tokens[1..].join(" "))
                } else {
                    None
                };
                self.list_contacts(query.as_deref())?;
                Ok(LoopAction::Continue)
            }
            "delete-account" => {
                self.delete_account()?;
                Ok(LoopAction::Continue)
            }
            "reactivate" => {
                self.reactivate()?;
                Ok(LoopAction::Continue)
            }
            "clear" => {
                print!("\x1B[2J\x1B[1;1H");
                Ok(LoopAction::Continue)
            }
            "quit" | "exit" => Ok(LoopAction::Exit),
            other => {
                println!("Unknown command '{other}'. Type 'help' for a list of commands.");
                Ok(LoopAction::Continue)
            }
        }
    }

    fn print_help(&self) {
        println!("Available commands:");
        println!("  help                 Show this help message");
        println!("  register EMAIL PW [NAME]  Create an account and sign in");
        println!("  login EMAIL PW       Sign in to an existing account");
        println!("  logout               Sign out of the current session");
        println!("  whoami               Show the signed-in account");
        println!("  feed                 Reload the community feed");
        println!("  next / prev          Move one feed page");
        println!("  page N               Jump to feed page N");
        println!("  post \"TEXT\" [CATEGORY]  Publish a community post");
        println!("  like <post_id>       Toggle your like on a post");
        println!("  comment <post_id> \"TEXT\"  Comment on a post");
        println!("  contacts [QUERY]     List emergency hotlines");
        println!("  delete-account       Schedule this account for deletion");
        println!("  reactivate           Cancel a pending account deletion");
        println!("  clear                Clear the screen");
        println!("  exit                 Quit the CLI");
    }

    fn author(&self) -> Option<Author> {
        self.login.as_ref().map(|active| Author {
            id: active.user.id.clone(),
            name: resolve_display_name(active.user.display_name.as_deref(), &active.user.email),
        })
    }

    fn register(
        &mut self,
        email: String,
        password: String,
        display_name: Option<String>,
    ) -> Result<()> {
        let grant = self.auth.register(RegisterInput {
            email,
            password,
            display_name,
        })?;
        println!("Registered and signed in as {}", grant.user.email);
        self.login = Some(ActiveLogin {
            token: grant.token,
            user: grant.user,
        });
        Ok(())
    }

    fn login(&mut self, email: String, password: String) -> Result<()> {
        match self.auth.login(LoginInput { email, password })? {
            LoginOutcome::Active(grant) => {
                println!("Signed in as {}", grant.user.email);
                self.login = Some(ActiveLogin {
                    token: grant.token,
                    user: grant.user,
                });
            }
            LoginOutcome::PendingDeletion(grant) => {
                println!("Signed in as {}", grant.user.email);
                println!(
                    "This account is scheduled for permanent deletion at {}.",
                    format_millis(grant.scheduled_permanent_deletion_at)
                );
                println!("Run 'reactivate' to keep it.");
                self.login = Some(ActiveLogin {
                    token: grant.token,
                    user: grant.user,
                });
            }
        }
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        let Some(active) = self.login.take() else {
            println!("Not signed in.");
            return Ok(());
        };
        self.auth.logout(&active.token)?;
        println!("Signed out {}", active.user.email);
        Ok(())
    }

    fn whoami(&self) {
        match &self.login {
            Some(active) => {
                println!("{}", active.user.email);
                if let Some(name) = &active.user.display_name {
                    println!("Display name: {name}");
                }
            }
            None => println!("Not signed in."),
        }
    }

    fn refresh_feed(&mut self) -> Result<()> {
        let posts = self.posts.list_feed()?;
        self.pager.set_posts(posts);
        self.print_page();
        Ok(())
    }

    fn print_page(&self) {
        let visible = self.pager.visible();
        if visible.is_empty() {
            println!("(no posts on this page)");
        }
        for post in visible {
            println!();
            println!(
                "[{}] {} - {}",
                post.id,
                post.author_name,
                format_millis(post.timestamp)
            );
            println!("  ({}) {}", post.category.as_str(), post.content);
            println!(
                "  likes: {}  comments: {}",
                post.likes.len(),
                post.comments.len()
            );
        }
        println!();
        println!(
            "Page {} of {} ({} posts)",
            self.pager.current_page(),
            self.pager.total_pages(),
            self.pager.total_posts()
        );
    }

    fn create_post(&mut self, content: String, category: Option<String>) -> Result<()> {
        let Some(author) = self.author() else {
            println!("Sign in first with 'login'.");
            return Ok(());
        };
        let input = CreatePostInput {
            content,
            category: category
                .as_deref()
                .map(PostCategory::from_name)
                .unwrap_or_default(),
            timestamp: None,
        };
        let post = self.posts.create_post(&author, input)?;
        println!("Posted {}", post.id);
        self.refresh_feed()
    }

    fn like(&mut self, post_id: &str) -> Result<()> {
        let Some(author) = self.author() else {
            println!("Sign in first with 'login'.");
            return Ok(());
        };
        self.posts.toggle_like(post_id, &author.id)?;
        self.refresh_feed()
    }

    fn comment(&mut self, post_id: &str, text: String) -> Result<()> {
        let Some(author) = self.author() else {
            println!("Sign in first with 'login'.");
            return Ok(());
        };
        match self.posts.add_comment(post_id, &author, text)? {
            Some(comment) => println!("Commented {}", comment.id),
            None => println!("Post {post_id} no longer exists."),
        }
        self.refresh_feed()
    }

    fn list_contacts(&self, query: Option<&str>) -> Result<()> {
        let contacts = self.contacts.list_filtered(None, query)?;
        if contacts.is_empty() {
            println!("No hotlines match.");
            return Ok(());
        }
        println!("Hotlines:");
        for contact in contacts {
            println!(
                "  {} {} - {} ({})",
                contact.icon_symbol(),
                contact.name,
                contact.phone_number,
                contact.category
            );
        }
        Ok(())
    }

    fn delete_account(&mut self) -> Result<()> {
        let Some(active) = self.login.take() else {
            println!("Not signed in.");
            return Ok(());
        };
        let record = self.auth.request_deletion(&active.user.id)?;
        println!(
            "Account scheduled for permanent deletion at {}.",
            format_millis(record.scheduled_permanent_deletion_at)
        );
        println!("Sign in again and run 'reactivate' within 30 days to keep it.");
        Ok(())
    }

    fn reactivate(&mut self) -> Result<()> {
        let Some(active) = &self.login else {
            println!("Sign in first with 'login'.");
            return Ok(());
        };
        self.auth.reactivate(&active.user.id)?;
        println!("Deletion canceled. Welcome back!");
        Ok(())
    }
}
