//! Demo-data seeding.
//!
//! Inserts a small fixed catalog (categories, movies, authors, books) so a
//! fresh database has something to serve. Every insert is keyed on the
//! unique slug (or name pair for authors) with ON CONFLICT DO NOTHING, so
//! running the seed on every startup is safe.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

pub async fn seed_demo_data(pool: &PgPool) -> Result<(), sqlx::Error> {
    seed_categories(pool).await?;
    seed_movies(pool).await?;
    seed_authors(pool).await?;
    seed_books(pool).await?;
    tracing::info!("Demo catalog seeded");
    Ok(())
}

async fn seed_categories(pool: &PgPool) -> Result<(), sqlx::Error> {
    let categories: [(&str, &str, &str); 7] = [
        ("Action", "action", "High-energy films with physical stunts and chases"),
        ("Adventure", "adventure", "Journeys into the unknown"),
        ("Comedy", "comedy", "Films intended to make the audience laugh"),
        ("Drama", "drama", "Serious, plot-driven stories"),
        ("Fantasy", "fantasy", "Imaginative worlds and magic"),
        ("Horror", "horror", "Films that seek to frighten"),
        ("Mystery", "mystery", "Suspenseful whodunits"),
    ];

    for (name, slug, description) in categories {
        sqlx::query(
            "INSERT INTO movie_categories (name, slug, description)
             VALUES ($1, $2, $3)
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .execute(pool)
        .await?;
    }
    Ok(())
}

struct MovieSeed {
    title: &'static str,
    slug: &'static str,
    description: &'static str,
    release_date: &'static str,
    duration_minutes: i32,
    rating: Option<&'static str>,
    director: &'static str,
    category_slug: &'static str,
    is_active: bool,
}

async fn seed_movies(pool: &PgPool) -> Result<(), sqlx::Error> {
    let movies = [
        MovieSeed {
            title: "Inception",
            slug: "inception",
            description: "A thief who steals corporate secrets through dream-sharing \
                          technology is given the inverse task of planting an idea into \
                          the mind of a CEO.",
            release_date: "2010-07-16",
            duration_minutes: 148,
            rating: Some("8.8"),
            director: "Christopher Nolan",
            category_slug: "action",
            is_active: true,
        },
        MovieSeed {
            title: "The Matrix",
            slug: "the-matrix",
            description: "A computer hacker learns from mysterious rebels about the true \
                          nature of his reality and his role in the war against its \
                          controllers.",
            release_date: "1999-03-31",
            duration_minutes: 136,
            rating: Some("8.7"),
            director: "Lana Wachowski, Lilly Wachowski",
            category_slug: "action",
            is_active: true,
        },
        MovieSeed {
            title: "Interstellar",
            slug: "interstellar",
            description: "A team of explorers travel through a wormhole in space in an \
                          attempt to ensure humanity's survival.",
            release_date: "2014-11-07",
            duration_minutes: 169,
            rating: Some("8.6"),
            director: "Christopher Nolan",
            category_slug: "adventure",
            is_active: true,
        },
        MovieSeed {
            title: "The Dark Knight",
            slug: "the-dark-knight",
            description: "When the menace known as the Joker emerges from his mysterious \
                          past, Batman must accept one of the greatest psychological and \
                          physical tests of his ability to fight injustice.",
            release_date: "2008-07-18",
            duration_minutes: 152,
            rating: Some("9.0"),
            director: "Christopher Nolan",
            category_slug: "action",
            is_active: true,
        },
        MovieSeed {
            title: "Quantum Horizons",
            slug: "quantum-horizons",
            description: "A brilliant physicist discovers a way to manipulate time itself, \
                          but faces moral dilemmas when governments seek to weaponize the \
                          technology.",
            release_date: "2025-09-15",
            duration_minutes: 162,
            rating: None,
            director: "Denis Villeneuve",
            category_slug: "fantasy",
            is_active: false,
        },
    ];

    for m in movies {
        let release_date = NaiveDate::parse_from_str(m.release_date, "%Y-%m-%d")
            .expect("seed release_date must be valid");
        let rating = m.rating.map(|r| r.parse::<Decimal>().expect("seed rating must be valid"));
        sqlx::query(
            "INSERT INTO movies (title, slug, description, release_date, duration_minutes,
                                 rating, director, category_id, is_active)
             SELECT $1, $2, $3, $4, $5, $6, $7, c.id, $9
             FROM movie_categories c WHERE c.slug = $8
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(m.title)
        .bind(m.slug)
        .bind(m.description)
        .bind(release_date)
        .bind(m.duration_minutes)
        .bind(rating)
        .bind(m.director)
        .bind(m.category_slug)
        .bind(m.is_active)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn seed_authors(pool: &PgPool) -> Result<(), sqlx::Error> {
    let authors: [(&str, &str, &str, &str, Option<&str>, &str); 2] = [
        (
            "Leo",
            "Tolstoy",
            "Russian writer regarded as one of the greatest authors of all time.",
            "1828-09-09",
            Some("1910-11-20"),
            "Russian",
        ),
        (
            "Fyodor",
            "Dostoevsky",
            "Russian novelist who explored the human psyche in the troubled political \
             and social atmosphere of 19th-century Russia.",
            "1821-11-11",
            Some("1881-02-09"),
            "Russian",
        ),
    ];

    for (first_name, last_name, biography, birth, death, nationality) in authors {
        let birth_date = NaiveDate::parse_from_str(birth, "%Y-%m-%d")
            .expect("seed birth_date must be valid");
        let death_date = death
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").expect("seed death_date must be valid"));
        // Authors carry no slug; dedupe on the (first_name, last_name) pair.
        sqlx::query(
            "INSERT INTO authors (first_name, last_name, biography, birth_date, death_date,
                                  nationality)
             SELECT $1, $2, $3, $4, $5, $6
             WHERE NOT EXISTS (
                 SELECT 1 FROM authors WHERE first_name = $1 AND last_name = $2
             )",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(biography)
        .bind(birth_date)
        .bind(death_date)
        .bind(nationality)
        .execute(pool)
        .await?;
    }
    Ok(())
}

struct BookSeed {
    title: &'static str,
    slug: &'static str,
    description: &'static str,
    author_last_name: &'static str,
    publication_date: &'static str,
    isbn: &'static str,
    page_count: i32,
    is_active: bool,
}

async fn seed_books(pool: &PgPool) -> Result<(), sqlx::Error> {
    let books = [
        BookSeed {
            title: "War and Peace",
            slug: "war_and_peace",
            description: "Epic novel about the French invasion of Russia",
            author_last_name: "Tolstoy",
            publication_date: "1869-01-01",
            isbn: "978-0199232765",
            page_count: 1225,
            is_active: true,
        },
        BookSeed {
            title: "Crime and Punishment",
            slug: "crime_and_punishment",
            description: "Novel about moral dilemmas",
            author_last_name: "Dostoevsky",
            publication_date: "1866-01-01",
            isbn: "978-0486415871",
            page_count: 430,
            is_active: true,
        },
        BookSeed {
            title: "Anna Karenina",
            slug: "anna_karenina",
            description: "Tragic novel about love and society",
            author_last_name: "Tolstoy",
            publication_date: "1878-01-01",
            isbn: "978-0143035008",
            page_count: 864,
            is_active: true,
        },
        BookSeed {
            title: "The Idiot",
            slug: "the_idiot",
            description: "Novel about a truly good man",
            author_last_name: "Dostoevsky",
            publication_date: "1869-01-01",
            isbn: "978-0375702242",
            page_count: 656,
            is_active: false,
        },
        BookSeed {
            title: "Resurrection",
            slug: "resurrection",
            description: "Novel about moral redemption",
            author_last_name: "Tolstoy",
            publication_date: "1899-01-01",
            isbn: "978-0192831115",
            page_count: 492,
            is_active: true,
        },
    ];

    for b in books {
        let publication_date = NaiveDate::parse_from_str(b.publication_date, "%Y-%m-%d")
            .expect("seed publication_date must be valid");
        sqlx::query(
            "INSERT INTO books (title, slug, description, author_id, publication_date, isbn,
                                page_count, is_active)
             SELECT $1, $2, $3, a.id, $5, $6, $7, $8
             FROM authors a WHERE a.last_name = $4
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(b.title)
        .bind(b.slug)
        .bind(b.description)
        .bind(b.author_last_name)
        .bind(publication_date)
        .bind(b.isbn)
        .bind(b.page_count)
        .bind(b.is_active)
        .execute(pool)
        .await?;
    }
    Ok(())
}
